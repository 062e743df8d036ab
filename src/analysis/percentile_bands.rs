use super::errors::ShapeError;
use super::percentile::{percentile_of_sorted, validate_level};
use super::rank_curve::rank_percentiles;
use crate::data::missing::sort_missing_last;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Percentile levels drawn in the fan chart, widest band first.
pub const DEFAULT_PERCENTILE_LEVELS: [f64; 11] = [
    100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0, 0.0,
];

type Result<T> = core::result::Result<T, ShapeError>;

/// The envelope curve for a single percentile level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    /// Percentile level within `0..=100`.
    pub level: f64,
    /// Envelope value at each rank position.
    pub values: Vec<Option<f64>>,
}

impl PercentileBand {
    /// Share of the ensemble lying between the minimum envelope and this band,
    /// formatted the way the legend shows it (e.g. `"10 %"` for the 90th percentile).
    pub fn frequency_label(&self) -> String {
        format!("{:.0} %", 100.0 - self.level)
    }
}

/// Rank-position-wise percentile envelopes of an ensemble.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PercentileBands {
    /// Percentile rank of each position; shared with the historical curve.
    pub ranks: Vec<f64>,
    /// One envelope per requested level, in the order they were requested.
    pub bands: Vec<PercentileBand>,
    /// Per-position minimum across the ensemble; the lower edge of every shaded band.
    pub minimum: Vec<Option<f64>>,
}

impl PercentileBands {
    /// Finds the envelope for `level`, if it was computed.
    pub fn band(&self, level: f64) -> Option<&PercentileBand> {
        self.bands.iter().find(|band| band.level == level)
    }

    /// Number of rank positions.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Sorts each member (column) of a `[years x members]` matrix ascending, missing values last.
///
/// Row `m` of the result holds the m-th smallest annual total of every member.
pub fn sort_members(annual_totals: ArrayView2<Option<f64>>) -> Array2<Option<f64>> {
    let mut sorted = annual_totals.to_owned();
    for mut column in sorted.axis_iter_mut(Axis(1)) {
        let mut values = column.to_vec();
        sort_missing_last(&mut values);
        column
            .iter_mut()
            .zip(values)
            .for_each(|(slot, value)| *slot = value);
    }

    sorted
}

/// Computes the percentile envelopes of an ensemble whose members were sorted independently.
///
/// For rank position `m` and level `p`, the envelope is the `p`-th percentile of the values
/// at row `m` across all members. The envelope at `m` is therefore built from the m-th
/// smallest year of every member, not from a single member's curve.
///
/// A row with any missing value yields a missing envelope value for every level.
///
/// # Arguments
///
/// * `sorted_members` - `[years x members]` matrix, each column sorted ascending (see [`sort_members`]).
/// * `levels` - Percentile levels within `0..=100`.
///
/// # Errors
///
/// * [`ShapeError::EmptyEnsemble`] if there are no members.
/// * [`ShapeError::InvalidPercentile`] if a level lies outside `0..=100`.
pub fn ensemble_percentile_bands(
    sorted_members: ArrayView2<Option<f64>>,
    levels: &[f64],
) -> Result<PercentileBands> {
    let (num_years, num_members) = sorted_members.dim();
    if num_members == 0 {
        return Err(ShapeError::EmptyEnsemble);
    }

    for &level in levels {
        validate_level(level)?;
    }

    let mut bands: Vec<PercentileBand> = levels
        .iter()
        .map(|&level| PercentileBand {
            level,
            values: Vec::with_capacity(num_years),
        })
        .collect();

    for row in sorted_members.axis_iter(Axis(0)) {
        let row: Option<Vec<f64>> = row.iter().copied().collect();
        match row {
            Some(mut row) => {
                row.sort_by(f64::total_cmp);
                for band in &mut bands {
                    band.values.push(percentile_of_sorted(&row, band.level));
                }
            }
            None => {
                for band in &mut bands {
                    band.values.push(None);
                }
            }
        }
    }

    Ok(PercentileBands {
        ranks: rank_percentiles(num_years),
        bands,
        minimum: minimum_envelope(sorted_members),
    })
}

/// Per-row minimum of a `[years x members]` matrix; missing if any member is missing
/// or the row is empty.
///
/// Equal to the `0`th percentile envelope.
pub fn minimum_envelope(sorted_members: ArrayView2<Option<f64>>) -> Vec<Option<f64>> {
    sorted_members
        .axis_iter(Axis(0))
        .map(|row| {
            let row: Option<Vec<f64>> = row.iter().copied().collect();
            row?.into_iter().min_by(f64::total_cmp)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use proptest::prelude::*;
    use rstest::rstest;

    fn to_optional(matrix: Array2<f64>) -> Array2<Option<f64>> {
        matrix.mapv(Some)
    }

    #[test]
    fn sort_members_sorts_each_column() {
        let totals = to_optional(array![[3.0, 10.0], [1.0, 30.0], [2.0, 20.0]]);
        let sorted = sort_members(totals.view());
        assert_eq!(sorted, to_optional(array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]));
    }

    #[test]
    fn sort_members_places_missing_last() {
        let totals = array![[Some(3.0)], [None], [Some(1.0)]];
        let sorted = sort_members(totals.view());
        assert_eq!(sorted, array![[Some(1.0)], [Some(3.0)], [None]]);
    }

    #[rstest]
    #[case::maximum(100.0, 100.0)]
    #[case::minimum(0.0, 50.0)]
    #[case::median(50.0, 78.0)]
    fn single_year_three_members(#[case] level: f64, #[case] expected: f64) {
        // Historical year sums to 78; the members sum to 50, 78 and 100.
        let sorted = to_optional(array![[50.0, 78.0, 100.0]]);
        let bands = ensemble_percentile_bands(sorted.view(), &[level]).unwrap();
        assert_eq!(bands.ranks, vec![100.0]);
        assert_eq!(bands.bands[0].values, vec![Some(expected)]);
    }

    #[test]
    fn extreme_levels_match_row_extremes() {
        let members = to_optional(array![
            [5.0, 1.0, 9.0, 4.0],
            [7.0, 2.0, 9.5, 8.0],
            [8.0, 6.0, 12.0, 8.5],
        ]);
        let sorted = sort_members(members.view());
        let bands = ensemble_percentile_bands(sorted.view(), &DEFAULT_PERCENTILE_LEVELS).unwrap();

        assert_eq!(bands.band(100.0).unwrap().values, vec![Some(9.0), Some(9.5), Some(12.0)]);
        assert_eq!(bands.band(0.0).unwrap().values, vec![Some(1.0), Some(2.0), Some(6.0)]);
        assert_eq!(bands.minimum, bands.band(0.0).unwrap().values);
        // Even member count: the median interpolates between the two middle values.
        assert_eq!(bands.band(50.0).unwrap().values, vec![Some(4.5), Some(7.5), Some(8.25)]);
    }

    #[test]
    fn single_member_bands_equal_member_curve() {
        let sorted = to_optional(array![[1.0], [4.0], [9.0]]);
        let bands = ensemble_percentile_bands(sorted.view(), &DEFAULT_PERCENTILE_LEVELS).unwrap();
        for band in &bands.bands {
            assert_eq!(band.values, vec![Some(1.0), Some(4.0), Some(9.0)]);
        }
    }

    #[test]
    fn missing_value_masks_its_rank_position() {
        let sorted = array![[Some(1.0), Some(2.0)], [Some(3.0), None]];
        let bands = ensemble_percentile_bands(sorted.view(), &[50.0]).unwrap();
        assert_eq!(bands.bands[0].values, vec![Some(1.5), None]);
        assert_eq!(bands.minimum, vec![Some(1.0), None]);
    }

    #[test]
    fn keeps_requested_level_order() {
        let sorted = to_optional(array![[1.0, 2.0]]);
        let bands = ensemble_percentile_bands(sorted.view(), &[10.0, 90.0, 50.0]).unwrap();
        let levels: Vec<f64> = bands.bands.iter().map(|b| b.level).collect();
        assert_eq!(levels, vec![10.0, 90.0, 50.0]);
    }

    #[test]
    fn rejects_empty_ensemble() {
        let sorted: Array2<Option<f64>> = Array2::from_elem((3, 0), None);
        assert_eq!(
            ensemble_percentile_bands(sorted.view(), &[50.0]),
            Err(ShapeError::EmptyEnsemble)
        );
    }

    #[test]
    fn rejects_invalid_level() {
        let sorted = to_optional(array![[1.0]]);
        assert_eq!(
            ensemble_percentile_bands(sorted.view(), &[110.0]),
            Err(ShapeError::InvalidPercentile(110.0))
        );
    }

    #[test]
    fn frequency_labels() {
        let band = PercentileBand {
            level: 90.0,
            values: Vec::new(),
        };
        assert_eq!(band.frequency_label(), "10 %");
    }

    #[test]
    fn minimum_envelope_matches_zero_band() {
        let sorted = to_optional(array![[3.0, 1.0], [5.0, 4.0]]);
        assert_eq!(minimum_envelope(sorted.view()), vec![Some(1.0), Some(4.0)]);
    }

    #[rstest]
    #[case::infinite(array![[f64::INFINITY, f64::INFINITY]].mapv(Some))]
    #[case::negative_infinite(array![[f64::NEG_INFINITY, 2.0], [1.0, f64::INFINITY]].mapv(Some))]
    #[case::missing(array![[Some(1.0), None], [Some(2.0), Some(3.0)]])]
    fn minimum_envelope_equals_bands_minimum_and_zero_level(#[case] sorted: Array2<Option<f64>>) {
        let bands = ensemble_percentile_bands(sorted.view(), &[0.0]).unwrap();
        let minimum = minimum_envelope(sorted.view());
        assert_eq!(minimum, bands.minimum);
        assert_eq!(minimum, bands.bands[0].values);
    }

    #[test]
    fn minimum_envelope_of_empty_rows_is_missing() {
        let sorted = Array2::<Option<f64>>::from_elem((2, 0), None);
        assert_eq!(minimum_envelope(sorted.view()), vec![None, None]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(
            if cfg!(feature = "extended_proptests") { 4096 } else { 256 }
        ))]

        #[test]
        fn bands_are_nested(
            values in proptest::collection::vec(0.0f64..1e5, 5 * 7),
        ) {
            let members = Array2::from_shape_vec((5, 7), values).unwrap().mapv(Some);
            let sorted = sort_members(members.view());
            let bands = ensemble_percentile_bands(sorted.view(), &DEFAULT_PERCENTILE_LEVELS).unwrap();

            // Higher levels never fall below lower levels at the same rank position.
            for pair in bands.bands.windows(2) {
                for (upper, lower) in pair[0].values.iter().zip(&pair[1].values) {
                    prop_assert!(upper.unwrap() >= lower.unwrap());
                }
            }

            for (row, band_max) in sorted.axis_iter(Axis(0)).zip(&bands.bands[0].values) {
                let max = row.iter().map(|v| v.unwrap()).fold(f64::NEG_INFINITY, f64::max);
                prop_assert_eq!(band_max.unwrap(), max);
            }
        }
    }
}
