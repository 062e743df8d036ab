use super::annual_totals::MONTHS_PER_YEAR;
use super::errors::ShapeError;
use super::percentile::{percentile_of_score, validate_level, ScoreKind};
use super::percentile_bands::{
    ensemble_percentile_bands, sort_members, PercentileBands, DEFAULT_PERCENTILE_LEVELS,
};
use super::rank_curve::{sorted_rank_curve, RankCurve};
use crate::data::ensemble::Ensemble;
use crate::data::series::MonthlySeries;
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

type Result<T> = core::result::Result<T, ShapeError>;

/// Everything needed to draw one panel of the shortage distribution figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortageDistribution {
    /// Shortage duration curve of the historical record.
    pub historical: RankCurve,
    /// Percentile envelopes of the synthetic ensemble, on the same rank axis.
    pub bands: PercentileBands,
    /// Percentile (rank kind) of each historical value among the ensemble values
    /// at the same rank position.
    pub historical_rank_in_ensemble: Vec<Option<f64>>,
    /// Number of ensemble members the envelopes were computed from.
    pub members: usize,
    /// Historical years with at least one missing month.
    pub missing_historical_years: usize,
    /// Synthetic (member, year) pairs with at least one missing month.
    pub missing_synthetic_years: usize,
}

/// Computes shortage duration curves and ensemble percentile bands.
///
/// The analyzer holds configuration only; [`analyze`](Self::analyze) can be called for
/// any number of (structure, design) pairs, from any thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortageDistributionAnalyzer {
    months_per_year: usize,
    levels: Vec<f64>,
}

impl Default for ShortageDistributionAnalyzer {
    fn default() -> Self {
        Self {
            months_per_year: MONTHS_PER_YEAR,
            levels: DEFAULT_PERCENTILE_LEVELS.to_vec(),
        }
    }
}

impl ShortageDistributionAnalyzer {
    /// Creates an analyzer with a custom period and set of percentile levels.
    ///
    /// # Errors
    ///
    /// * [`ShapeError::ZeroPeriod`] if `months_per_year` is zero.
    /// * [`ShapeError::InvalidPercentile`] if a level lies outside `0..=100`.
    pub fn new(months_per_year: usize, levels: Vec<f64>) -> Result<Self> {
        if months_per_year == 0 {
            return Err(ShapeError::ZeroPeriod);
        }

        for &level in &levels {
            validate_level(level)?;
        }

        Ok(Self {
            months_per_year,
            levels,
        })
    }

    pub fn months_per_year(&self) -> usize {
        self.months_per_year
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Computes the historical curve and the ensemble envelopes for one (structure, design) pair.
    ///
    /// # Arguments
    ///
    /// * `historical` - Monthly historical shortage of the structure.
    /// * `synthetic` - Monthly synthetic shortage, one column per ensemble member.
    ///
    /// # Errors
    ///
    /// * [`ShapeError::NotMultipleOfPeriod`] if the record does not hold whole years.
    /// * [`ShapeError::LengthMismatch`] if the ensemble covers a different number of months.
    /// * [`ShapeError::EmptyEnsemble`] if the ensemble has no members.
    pub fn analyze(
        &self,
        historical: &MonthlySeries,
        synthetic: &Ensemble,
    ) -> Result<ShortageDistribution> {
        if synthetic.members() == 0 {
            return Err(ShapeError::EmptyEnsemble);
        }

        if synthetic.months() != historical.len() {
            return Err(ShapeError::LengthMismatch {
                expected: historical.len(),
                actual: synthetic.months(),
            });
        }

        let historical_totals = historical.annual_totals(self.months_per_year)?;
        let historical_curve = sorted_rank_curve(historical_totals.values());

        let synthetic_totals = synthetic.annual_totals(self.months_per_year)?;
        let sorted_members = sort_members(synthetic_totals.view());
        let bands = ensemble_percentile_bands(sorted_members.view(), &self.levels)?;
        let historical_rank_in_ensemble =
            historical_rank_within_ensemble(&historical_curve, sorted_members.view());

        let missing_historical_years = historical_totals.missing_years();
        let missing_synthetic_years = synthetic_totals.iter().filter(|v| v.is_none()).count();
        debug!(
            years = historical_totals.len(),
            members = synthetic.members(),
            "Computed shortage distribution"
        );
        if missing_historical_years > 0 || missing_synthetic_years > 0 {
            warn!(
                missing_historical_years,
                missing_synthetic_years, "Years with failed runs are treated as missing"
            );
        }

        Ok(ShortageDistribution {
            historical: historical_curve,
            bands,
            historical_rank_in_ensemble,
            members: synthetic.members(),
            missing_historical_years,
            missing_synthetic_years,
        })
    }
}

/// For each rank position, the percentile of the historical value among the ensemble
/// values at that position.
///
/// Rank positions beyond the shorter of the two inputs are not reported.
pub fn historical_rank_within_ensemble(
    historical: &RankCurve,
    sorted_members: ArrayView2<Option<f64>>,
) -> Vec<Option<f64>> {
    historical
        .values
        .iter()
        .zip(sorted_members.axis_iter(Axis(0)))
        .map(|(&value, row)| percentile_of_score(&row.to_vec(), value, ScoreKind::Rank))
        .collect()
}
