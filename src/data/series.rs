use super::missing::from_raw_slice;
use crate::analysis::annual_totals::compute_annual_totals;
use crate::analysis::errors::ShapeError;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// One value per month for a single structure; `None` marks a month of a failed run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, new)]
pub struct MonthlySeries {
    values: Vec<Option<f64>>,
}

impl MonthlySeries {
    /// Creates a series from raw simulator output, treating negative values as missing.
    pub fn from_raw(raw: &[f64]) -> Self {
        Self::new(from_raw_slice(raw))
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of months which are missing.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Sums the series into annual totals.
    ///
    /// # Errors
    ///
    /// [`ShapeError::NotMultipleOfPeriod`] if the series does not contain whole years.
    pub fn annual_totals(&self, months_per_year: usize) -> Result<AnnualSeries, ShapeError> {
        compute_annual_totals(&self.values, months_per_year).map(AnnualSeries::new)
    }
}

impl From<Vec<Option<f64>>> for MonthlySeries {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self::new(values)
    }
}

/// One total per year, in chronological order; `None` marks a year containing a missing month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, new)]
pub struct AnnualSeries {
    values: Vec<Option<f64>>,
}

impl AnnualSeries {
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<f64>> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of years whose total could not be computed.
    pub fn missing_years(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}
