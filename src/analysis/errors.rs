use thiserror::Error;

/// Represents input whose shape does not fit the requested computation.
///
/// These are data or programmer errors, never transient; callers abort the
/// affected (structure, design) panel and report it.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ShapeError {
    #[error("Series of length {len} is not a multiple of the period ({period})")]
    NotMultipleOfPeriod { len: usize, period: usize },

    #[error("The period (number of months per year) must be non-zero")]
    ZeroPeriod,

    #[error("Ensemble has {actual} months but the historical record has {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("The ensemble does not contain any members")]
    EmptyEnsemble,

    #[error("Percentile level {0} is outside of the valid range 0-100")]
    InvalidPercentile(f64),

    #[error("Requested {requested} ensemble members but only {available} are available")]
    NotEnoughMembers { requested: usize, available: usize },
}
