/// The value the simulator writes for months belonging to a failed run.
pub const FAILED_RUN_SENTINEL: f64 = -999.9;

/// Converts a raw simulator value into an optional one.
///
/// Any negative value (including [`FAILED_RUN_SENTINEL`]) and NaN are treated as missing.
/// Shortage volumes are never negative, so this never discards a real value.
#[inline]
pub fn from_raw(value: f64) -> Option<f64> {
    if value.is_nan() || value < 0.0 {
        None
    } else {
        Some(value)
    }
}

/// Converts a slice of raw simulator values into optional values.
pub fn from_raw_slice(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(from_raw).collect()
}

/// Orders two optional values ascending, with missing values placed last.
///
/// This matches how NumPy sorts NaN, which keeps our curves comparable with the
/// previously published ones.
#[inline]
pub fn cmp_missing_last(a: &Option<f64>, b: &Option<f64>) -> core::cmp::Ordering {
    use core::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts optional values ascending in place, missing values last.
pub fn sort_missing_last(values: &mut [Option<f64>]) {
    values.sort_by(cmp_missing_last);
}
