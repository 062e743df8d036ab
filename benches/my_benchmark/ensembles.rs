use ndarray::Array2;
use shortage_distributions::prelude::*;

/// Years of the historical record (1950-2013).
pub const YEARS: usize = 64;

/// Deterministic monthly shortage in `0..1000`, with roughly a third of months dry.
fn shortage(month: usize, member: usize) -> f64 {
    let hash = (month as u64 + 1)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((member as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F));
    let value = (hash >> 33) % 3000;
    if value < 2000 {
        0.0
    } else {
        (value - 2000) as f64
    }
}

pub fn historical() -> MonthlySeries {
    let raw: Vec<f64> = (0..YEARS * 12).map(|month| shortage(month, usize::MAX)).collect();
    MonthlySeries::from_raw(&raw)
}

/// A `[months x members]` ensemble, like a 1000 sample design after member selection.
pub fn ensemble(members: usize) -> Ensemble {
    let raw = Array2::from_shape_fn((YEARS * 12, members), |(month, member)| shortage(month, member));
    Ensemble::from_raw(raw.view())
}
