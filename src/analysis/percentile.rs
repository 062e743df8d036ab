use super::errors::ShapeError;
use serde::{Deserialize, Serialize};

/// Checks that a percentile level lies within `0..=100`.
pub fn validate_level(level: f64) -> Result<(), ShapeError> {
    if (0.0..=100.0).contains(&level) {
        Ok(())
    } else {
        Err(ShapeError::InvalidPercentile(level))
    }
}

/// Computes the `level`-th percentile of values already sorted ascending.
///
/// Uses linear interpolation between the two closest order statistics, so `0` is the
/// minimum, `100` is the maximum and `50` is the median. Returns `None` for empty input.
///
/// The caller is responsible for `level` lying within `0..=100`.
pub fn percentile_of_sorted(sorted: &[f64], level: f64) -> Option<f64> {
    let count = sorted.len();
    if count == 0 {
        return None;
    }

    if count == 1 {
        return Some(sorted[0]);
    }

    let index = (level / 100.0) * (count - 1) as f64;
    let lower = index.floor() as usize;
    let upper = (index.ceil() as usize).min(count - 1);
    if lower == upper {
        return Some(sorted[lower]);
    }

    Some(lerp(sorted[lower], sorted[upper], index - lower as f64))
}

/// Computes the `level`-th percentile of a set of optional values.
///
/// A single missing value makes the result missing; the percentile of an incomplete
/// set is not meaningful.
///
/// # Errors
///
/// [`ShapeError::InvalidPercentile`] if `level` is outside `0..=100`.
pub fn percentile(values: &[Option<f64>], level: f64) -> Result<Option<f64>, ShapeError> {
    validate_level(level)?;

    let sorted: Option<Vec<f64>> = values.iter().copied().collect();
    Ok(sorted.and_then(|mut sorted| {
        sorted.sort_by(f64::total_cmp);
        percentile_of_sorted(&sorted, level)
    }))
}

/// Interpolation in the same form NumPy uses, which is monotonic and exact at both ends.
#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// How [`percentile_of_score`] treats values equal to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreKind {
    /// Average of `Weak` and `Strict`, with ties counted at their average position.
    #[default]
    Rank,
    /// Percentage of values less than or equal to the score.
    Weak,
    /// Percentage of values strictly less than the score.
    Strict,
    /// Plain average of `Weak` and `Strict`.
    Mean,
}

/// Computes the percentile rank of `score` relative to `values`.
///
/// Missing entries in `values` are ignored. Returns `None` when `score` is missing or no
/// value is present.
pub fn percentile_of_score(values: &[Option<f64>], score: Option<f64>, kind: ScoreKind) -> Option<f64> {
    let score = score?;
    let present = values.iter().flatten();

    let mut count = 0usize;
    let mut below = 0usize;
    let mut at_or_below = 0usize;
    for &value in present {
        count += 1;
        if value < score {
            below += 1;
        }
        if value <= score {
            at_or_below += 1;
        }
    }

    if count == 0 {
        return None;
    }

    let total = count as f64;
    let below = below as f64;
    let at_or_below = at_or_below as f64;
    Some(match kind {
        ScoreKind::Weak => at_or_below / total * 100.0,
        ScoreKind::Strict => below / total * 100.0,
        ScoreKind::Mean => (below + at_or_below) * 50.0 / total,
        ScoreKind::Rank => {
            let score_present = if at_or_below > below { 1.0 } else { 0.0 };
            (below + at_or_below + score_present) * 50.0 / total
        }
    })
}
