use super::errors::ShapeError;
use crate::data::missing::from_raw_slice;
use ndarray::{s, Array2, ArrayView2};

/// Number of months in a hydrological year.
pub const MONTHS_PER_YEAR: usize = 12;

type Result<T> = core::result::Result<T, ShapeError>;

/// Sums consecutive chunks of `months_per_year` values into one total per year.
///
/// A missing month poisons the total of its year; it is never skipped.
///
/// # Arguments
///
/// * `series` - Monthly values, chronological.
/// * `months_per_year` - Size of each chunk, normally [`MONTHS_PER_YEAR`].
///
/// # Errors
///
/// * [`ShapeError::ZeroPeriod`] if `months_per_year` is zero.
/// * [`ShapeError::NotMultipleOfPeriod`] if `series` does not hold a whole number of years.
pub fn compute_annual_totals(
    series: &[Option<f64>],
    months_per_year: usize,
) -> Result<Vec<Option<f64>>> {
    check_period(series.len(), months_per_year)?;
    Ok(series
        .chunks_exact(months_per_year)
        .map(sum_year)
        .collect())
}

/// Same as [`compute_annual_totals`], but takes raw simulator output in which any
/// negative value marks a missing month.
pub fn compute_annual_totals_raw(series: &[f64], months_per_year: usize) -> Result<Vec<Option<f64>>> {
    compute_annual_totals(&from_raw_slice(series), months_per_year)
}

/// Computes annual totals for every column of a `[months x members]` matrix.
///
/// Returns a `[years x members]` matrix, column `j` of which holds the annual
/// totals of member `j`.
pub fn compute_ensemble_annual_totals(
    months: ArrayView2<Option<f64>>,
    months_per_year: usize,
) -> Result<Array2<Option<f64>>> {
    let (num_months, num_members) = months.dim();
    check_period(num_months, months_per_year)?;

    let num_years = num_months / months_per_year;
    Ok(Array2::from_shape_fn((num_years, num_members), |(year, member)| {
        let start = year * months_per_year;
        months
            .slice(s![start..start + months_per_year, member])
            .iter()
            .copied()
            .sum()
    }))
}

#[inline]
fn sum_year(months: &[Option<f64>]) -> Option<f64> {
    // Sum over Option short circuits to None on the first missing month.
    months.iter().copied().sum()
}

fn check_period(len: usize, months_per_year: usize) -> Result<()> {
    if months_per_year == 0 {
        return Err(ShapeError::ZeroPeriod);
    }

    if len % months_per_year != 0 {
        return Err(ShapeError::NotMultipleOfPeriod {
            len,
            period: months_per_year,
        });
    }

    Ok(())
}
