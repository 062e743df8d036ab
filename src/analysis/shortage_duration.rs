use itertools::Itertools;

/// Lengths of the maximal runs of consecutive periods spent in shortage.
///
/// A period is in shortage when its magnitude is strictly positive. Missing periods are
/// not counted as shortage and end the current run.
///
/// # Example
///
/// ```
/// use shortage_distributions::analysis::shortage_duration::shortage_duration_runs;
///
/// let runs = shortage_duration_runs(&[0.0, 0.0, 3.0, 4.0, 0.0, 5.0, 0.0, 0.0]);
/// assert_eq!(runs, vec![2, 1]);
/// ```
pub fn shortage_duration_runs(sequence: &[f64]) -> Vec<usize> {
    runs_where(sequence.iter().map(|&magnitude| magnitude > 0.0))
}

/// Same as [`shortage_duration_runs`], for sequences with explicit missing periods.
pub fn shortage_duration_runs_optional(sequence: &[Option<f64>]) -> Vec<usize> {
    runs_where(
        sequence
            .iter()
            .map(|magnitude| magnitude.is_some_and(|m| m > 0.0)),
    )
}

fn runs_where(in_shortage: impl Iterator<Item = bool>) -> Vec<usize> {
    let mut lengths = Vec::new();
    for (flag, run) in &in_shortage.chunk_by(|&flag| flag) {
        if flag {
            lengths.push(run.count());
        }
    }

    lengths
}
