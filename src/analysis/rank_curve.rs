use crate::data::missing::sort_missing_last;
use serde::{Deserialize, Serialize};

/// Annual totals sorted ascending, paired with the percentile rank of each position.
///
/// This is the shortage duration curve of a single record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankCurve {
    /// Percentile rank of each position; `100 * (k + 1) / N`.
    pub ranks: Vec<f64>,
    /// Sorted values; missing years are placed last.
    pub values: Vec<Option<f64>>,
}

impl RankCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns (percentile rank, value) pairs, including missing positions.
    pub fn points(&self) -> impl Iterator<Item = (f64, Option<f64>)> + '_ {
        self.ranks.iter().copied().zip(self.values.iter().copied())
    }

    /// Returns (percentile rank, value) pairs for positions which have a value.
    pub fn present_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points().filter_map(|(rank, value)| value.map(|v| (rank, v)))
    }
}

/// Generates the percentile rank axis for `count` sorted values.
///
/// The k-th smallest value (0 indexed) has rank `100 * (k + 1) / count`, so the axis
/// runs from `100 / count` to exactly 100.
pub fn rank_percentiles(count: usize) -> Vec<f64> {
    let total = count as f64;
    (0..count)
        .map(|index| ((index + 1) as f64 / total) * 100.0)
        .collect()
}

/// Sorts annual totals ascending and pairs them with their percentile ranks.
///
/// Missing years sort after every present year, the way NumPy sorts NaN.
pub fn sorted_rank_curve(annual_totals: &[Option<f64>]) -> RankCurve {
    let mut values = annual_totals.to_vec();
    sort_missing_last(&mut values);

    RankCurve {
        ranks: rank_percentiles(values.len()),
        values,
    }
}
