//! Reading of the historical `<structure>_info_hist.txt` tables.
//!
//! These are whitespace delimited numeric tables, one row per month. Lines starting with
//! `#` and blank lines are skipped, the same way `numpy.loadtxt` treats them.

use crate::data::series::MonthlySeries;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Column of the historical table holding the monthly shortage volume.
pub const HISTORICAL_SHORTAGE_COLUMN: usize = 2;

/// Errors that can occur while reading a historical table
#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Invalid number '{token}' on line {line}")]
    InvalidNumber { line: usize, token: String },

    #[error("Line {line} has {found} columns, column {column} was requested")]
    MissingColumn {
        line: usize,
        column: usize,
        found: usize,
    },
}

type Result<T> = core::result::Result<T, ParsingError>;

/// Reads one column of a historical table as a monthly series.
///
/// Negative values (failed runs) become missing months.
///
/// # Arguments
/// * `file_path` - Path to the whitespace delimited table
/// * `column` - Zero based column index, normally [`HISTORICAL_SHORTAGE_COLUMN`]
pub fn read_historical_shortage(file_path: &Path, column: usize) -> Result<MonthlySeries> {
    let text = fs::read_to_string(file_path)?;
    let values = parse_column(&text, column)?;
    debug!(
        path = %file_path.display(),
        months = values.len(),
        "Loaded historical record"
    );
    Ok(MonthlySeries::from_raw(&values))
}

/// Parses one column out of the text of a whitespace delimited table.
pub fn parse_column(text: &str, column: usize) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        let line_number = index + 1;
        let mut found = 0;
        let mut value = None;
        for (position, token) in line.split_whitespace().enumerate() {
            found += 1;
            if position == column {
                value = Some(parse_number(token, line_number)?);
            }
        }

        match value {
            Some(value) => values.push(value),
            None => {
                return Err(ParsingError::MissingColumn {
                    line: line_number,
                    column,
                    found,
                })
            }
        }
    }

    Ok(values)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(start) => &line[..start],
        None => line,
    }
}

fn parse_number(token: &str, line: usize) -> Result<f64> {
    token.parse::<f64>().map_err(|_| ParsingError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}
