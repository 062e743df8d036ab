use super::missing::from_raw;
use super::series::MonthlySeries;
use crate::analysis::annual_totals::compute_ensemble_annual_totals;
use crate::analysis::errors::ShapeError;
use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

type Result<T> = core::result::Result<T, ShapeError>;

/// Which columns of an extracted ensemble take part in the percentile computation.
///
/// Extracted ensembles hold `realizations x samples` columns, ordered realization first
/// (column `r * samples + s` is realization `r` of sample `s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberSelection {
    /// Keep the first `samples` columns: one realization of every sampled parameter set.
    #[default]
    FirstRealization,
    /// Keep every realization of every sample.
    All,
}

/// Synthetic monthly values of every ensemble member, as a `[months x members]` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    months: Array2<Option<f64>>,
}

impl Ensemble {
    /// Wraps a `[months x members]` matrix of already converted values.
    pub fn new(months: Array2<Option<f64>>) -> Self {
        Self { months }
    }

    /// Creates an ensemble from raw simulator output, treating negative values as missing.
    pub fn from_raw(raw: ArrayView2<f64>) -> Self {
        Self::new(raw.mapv(from_raw))
    }

    /// Creates an ensemble from one monthly series per member.
    ///
    /// # Errors
    ///
    /// * [`ShapeError::EmptyEnsemble`] if `members` is empty.
    /// * [`ShapeError::LengthMismatch`] if the members are not all of the same length.
    pub fn from_members(members: &[MonthlySeries]) -> Result<Self> {
        let first = members.first().ok_or(ShapeError::EmptyEnsemble)?;
        let num_months = first.len();
        if let Some(mismatch) = members.iter().find(|m| m.len() != num_months) {
            return Err(ShapeError::LengthMismatch {
                expected: num_months,
                actual: mismatch.len(),
            });
        }

        Ok(Self::new(Array2::from_shape_fn(
            (num_months, members.len()),
            |(month, member)| members[member].values()[month],
        )))
    }

    pub fn view(&self) -> ArrayView2<Option<f64>> {
        self.months.view()
    }

    /// Number of months (rows).
    pub fn months(&self) -> usize {
        self.months.nrows()
    }

    /// Number of members (columns).
    pub fn members(&self) -> usize {
        self.months.ncols()
    }

    /// Returns the monthly series of a single member.
    pub fn member(&self, index: usize) -> Option<MonthlySeries> {
        (index < self.members())
            .then(|| MonthlySeries::new(self.months.index_axis(Axis(1), index).to_vec()))
    }

    /// Keeps the first `count` members.
    ///
    /// # Errors
    ///
    /// [`ShapeError::NotEnoughMembers`] if fewer than `count` members exist.
    pub fn first_members(&self, count: usize) -> Result<Self> {
        if count > self.members() {
            return Err(ShapeError::NotEnoughMembers {
                requested: count,
                available: self.members(),
            });
        }

        Ok(Self::new(self.months.slice(s![.., ..count]).to_owned()))
    }

    /// Applies a [`MemberSelection`] for an experiment with `samples` sampled parameter sets.
    pub fn select(&self, selection: MemberSelection, samples: usize) -> Result<Self> {
        match selection {
            MemberSelection::FirstRealization => self.first_members(samples),
            MemberSelection::All => Ok(self.clone()),
        }
    }

    /// Computes the `[years x members]` matrix of annual totals.
    pub fn annual_totals(&self, months_per_year: usize) -> Result<Array2<Option<f64>>> {
        compute_ensemble_annual_totals(self.view(), months_per_year)
    }
}
