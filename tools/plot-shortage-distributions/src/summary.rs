//! Plain-text summary of every panel
//!
//! Each computed panel is written as an ASCII table (via the [`tabled`] crate) listing the
//! historical curve next to a few ensemble envelopes, followed by a list of failed panels.

use crate::panels::Panel;
use shortage_distributions::prelude::*;
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};

/// Envelope levels shown in the summary tables.
const SUMMARY_LEVELS: [f64; 3] = [10.0, 50.0, 90.0];

/// A single rank position of a panel
#[derive(Debug, Clone, Tabled)]
pub struct CurveRow {
    #[tabled(rename = "Rank (%)")]
    pub rank: String,
    #[tabled(rename = "Historical")]
    pub historical: String,
    #[tabled(rename = "Min")]
    pub minimum: String,
    #[tabled(rename = "P10")]
    pub p10: String,
    #[tabled(rename = "P50")]
    pub p50: String,
    #[tabled(rename = "P90")]
    pub p90: String,
    /// Percentile of the historical value within the ensemble at this rank
    #[tabled(rename = "Hist. percentile")]
    pub historical_percentile: String,
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}", value),
        None => "-".to_string(),
    }
}

/// Builds one row per rank position of a computed panel.
pub fn curve_rows(distribution: &ShortageDistribution) -> Vec<CurveRow> {
    let bands = &distribution.bands;
    let [p10, p50, p90] = SUMMARY_LEVELS.map(|level| bands.band(level));
    let at = |band: Option<&PercentileBand>, index: usize| {
        format_value(band.and_then(|band| band.values.get(index).copied().flatten()))
    };

    distribution
        .historical
        .points()
        .enumerate()
        .map(|(index, (rank, historical))| CurveRow {
            rank: format!("{:.1}", rank),
            historical: format_value(historical),
            minimum: format_value(bands.minimum.get(index).copied().flatten()),
            p10: at(p10, index),
            p50: at(p50, index),
            p90: at(p90, index),
            historical_percentile: format_value(
                distribution
                    .historical_rank_in_ensemble
                    .get(index)
                    .copied()
                    .flatten(),
            ),
        })
        .collect()
}

/// Formats one panel: a titled table, or the error which prevented computing it.
pub fn format_panel(panel: &Panel) -> String {
    let title = format!("{} / {} ({})", panel.structure, panel.title, panel.design);
    let underline = "=".repeat(title.chars().count());

    let body = match &panel.outcome {
        Ok(distribution) => {
            let table = Table::new(curve_rows(distribution)).to_string();
            format!(
                "{}\nMembers: {}, missing years: {} historical, {} synthetic\n\
                 Historical shortage runs (years): {:?}",
                table,
                distribution.members,
                distribution.missing_historical_years,
                distribution.missing_synthetic_years,
                panel.historical_runs
            )
        }
        Err(e) => format!("Failed: {}", e),
    };

    format!("{}\n{}\n{}", title, underline, body)
}

/// Formats every panel followed by the list of failed panels.
pub fn format_summary(panels: &[Panel]) -> String {
    let mut sections: Vec<String> = panels.iter().map(format_panel).collect();

    let failed: Vec<String> = panels
        .iter()
        .filter(|panel| panel.is_failed())
        .map(|panel| format!("- {} / {}", panel.structure, panel.design))
        .collect();

    if failed.is_empty() {
        sections.push("All panels computed".to_string());
    } else {
        sections.push(format!("Failed panels ({}):\n{}", failed.len(), failed.join("\n")));
    }

    sections.join("\n\n")
}

/// Writes the summary of every panel to `output_path`.
pub fn write_summary(panels: &[Panel], output_path: &Path) -> std::io::Result<()> {
    fs::write(output_path, format_summary(panels))
}
