//! # Shortage Distributions
//!
//! Shortage duration curves (SDCs) for water-supply structures, and the percentile
//! envelopes ("fan charts") of synthetic ensembles that are overlaid on them.
//!
//! The [`analysis`] module is a pure computational core. Everything that touches the
//! filesystem lives under [`io`] and [`config`].

/// The shortage distribution computations.
///
/// Every function in here is pure; nothing keeps state between calls.
pub mod analysis {
    /// Shape errors raised by the analysis functions.
    pub mod errors;

    /// Summing monthly values into annual totals.
    pub mod annual_totals;

    /// Sorted annual totals paired with their rank percentiles.
    pub mod rank_curve;

    /// Percentile of a vector and percentile of a score.
    pub mod percentile;

    /// Rank-position-wise percentile envelopes across an ensemble.
    pub mod percentile_bands;

    /// Run lengths of consecutive periods spent in shortage.
    pub mod shortage_duration;

    /// Combines the above into a single result per (structure, design) pair.
    pub mod analyzer;
}

/// In-memory data structures with an explicit missing value representation.
pub mod data {
    /// Conversion of raw simulator output into optional values.
    pub mod missing;

    /// Monthly and annual series.
    pub mod series;

    /// A `[months x members]` matrix of synthetic values.
    pub mod ensemble;
}

/// Readers for the simulation output files.
pub mod io {
    /// Whitespace delimited text tables holding the historical record.
    pub mod historical;

    /// NumPy `.npy` arrays holding the synthetic ensembles.
    pub mod npy;

    /// Extraction of the shortage ensemble out of the raw synthetic array.
    pub mod synthetic;
}

/// Experiment configuration (designs, structures and file locations).
pub mod config;

pub mod prelude;
