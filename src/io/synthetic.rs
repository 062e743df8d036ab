//! Extraction of the shortage ensemble out of the raw `<structure>_info.npy` arrays.
//!
//! The raw arrays are `[months x variables x samples]`. Variable 0 is the year, odd
//! variables hold demand and even variables hold the shortage of one realization each.

use super::npy::{read_npy, NpyError};
use crate::data::ensemble::Ensemble;
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while extracting the shortage ensemble
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read synthetic array: {0}")]
    Npy(#[from] NpyError),

    #[error("Shortage column {column} requested but the array only has {available} variables")]
    ColumnOutOfRange { column: usize, available: usize },

    #[error("No shortage columns were selected")]
    NoColumns,
}

type Result<T> = core::result::Result<T, ExtractError>;

/// A `start..end` range of variable columns with a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub step: usize,
}

impl Default for ColumnRange {
    /// Shortage of realizations 1 to 10: columns 2, 4, ..., 20.
    fn default() -> Self {
        Self {
            start: 2,
            end: 22,
            step: 2,
        }
    }
}

impl ColumnRange {
    /// The selected column indices, ascending. Empty when `step` is zero.
    pub fn indices(&self) -> Vec<usize> {
        if self.step == 0 {
            return Vec::new();
        }

        (self.start..self.end).step_by(self.step).collect()
    }
}

/// Keeps the given variable columns and flattens them into ensemble members.
///
/// The `[months x columns x samples]` selection is reshaped in C order, so member
/// `c * samples + s` is column `c` of sample `s`. With one realization per column, the
/// first `samples` members are the first realization of every sample.
///
/// # Errors
///
/// * [`ExtractError::NoColumns`] if `columns` is empty.
/// * [`ExtractError::ColumnOutOfRange`] if a column does not exist.
pub fn extract_shortage_ensemble(raw: ArrayView3<f64>, columns: &[usize]) -> Result<Ensemble> {
    let (num_months, num_variables, num_samples) = raw.dim();
    if columns.is_empty() {
        return Err(ExtractError::NoColumns);
    }

    if let Some(&column) = columns.iter().find(|&&c| c >= num_variables) {
        return Err(ExtractError::ColumnOutOfRange {
            column,
            available: num_variables,
        });
    }

    let flattened = Array2::from_shape_fn(
        (num_months, columns.len() * num_samples),
        |(month, member)| raw[[month, columns[member / num_samples], member % num_samples]],
    );

    Ok(Ensemble::from_raw(flattened.view()))
}

/// Reads a synthetic `.npy` file and extracts its shortage ensemble.
pub fn load_synthetic_ensemble(file_path: &Path, columns: &[usize]) -> Result<Ensemble> {
    let raw = read_npy(file_path)?.into_array3()?;
    let ensemble = extract_shortage_ensemble(raw.view(), columns)?;
    debug!(
        path = %file_path.display(),
        months = ensemble.months(),
        members = ensemble.members(),
        "Extracted shortage ensemble"
    );
    Ok(ensemble)
}
