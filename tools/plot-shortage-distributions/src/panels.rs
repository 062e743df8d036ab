//! Computation of every (structure, design) panel of the figure.
//!
//! A panel which fails to load or to compute is kept, with its error, so the figure and
//! the summary can report it instead of silently dropping it.

use serde::Serialize;
use shortage_distributions::analysis::shortage_duration::shortage_duration_runs_optional;
use shortage_distributions::io::historical::{read_historical_shortage, ParsingError};
use shortage_distributions::io::synthetic::{load_synthetic_ensemble, ExtractError};
use shortage_distributions::prelude::*;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that abort a single panel
#[derive(Error, Debug)]
pub enum PanelError {
    /// Shared by every panel of the structure's row.
    #[error("Failed to read historical record: {0}")]
    Historical(#[source] Arc<ParsingError>),

    #[error("Failed to load synthetic ensemble: {0}")]
    Synthetic(#[from] ExtractError),

    #[error("Invalid data shape: {0}")]
    Shape(#[from] ShapeError),
}

/// The result of one (structure, design) pair.
#[derive(Debug, Serialize)]
pub struct Panel {
    pub structure: String,
    pub design: String,
    pub title: String,
    pub y_max: Option<f64>,
    /// Lengths (in years) of the consecutive historical years with shortage.
    pub historical_runs: Vec<usize>,
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: Result<ShortageDistribution, PanelError>,
}

impl Panel {
    pub fn distribution(&self) -> Option<&ShortageDistribution> {
        self.outcome.as_ref().ok()
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Serialized form of a panel outcome: `{"distribution": {...}}` or `{"error": "..."}`.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum SerializedOutcome<'a> {
    Distribution(&'a ShortageDistribution),
    Error(String),
}

fn serialize_outcome<S: serde::Serializer>(
    outcome: &Result<ShortageDistribution, PanelError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match outcome {
        Ok(distribution) => SerializedOutcome::Distribution(distribution).serialize(serializer),
        Err(e) => SerializedOutcome::Error(e.to_string()).serialize(serializer),
    }
}

/// Directories holding the simulation outputs.
#[derive(Debug, Clone, Copy)]
pub struct InputDirs<'a> {
    pub historical: &'a Path,
    pub synthetic: &'a Path,
}

/// Computes every panel, structures first (one figure row each), designs second.
///
/// `on_panel` is invoked after each panel, for progress reporting.
pub fn compute_panels(
    config: &ExperimentConfig,
    dirs: InputDirs,
    mut on_panel: impl FnMut(&Panel),
) -> Result<Vec<Panel>, ShapeError> {
    let analyzer =
        ShortageDistributionAnalyzer::new(config.months_per_year, config.percentile_levels.clone())?;
    let columns = config.shortage_columns.indices();

    let mut panels = Vec::with_capacity(config.structures.len() * config.designs.len());

    for structure in &config.structures {
        // Each historical record is shared by a whole row of panels.
        let path = config.historical_path(dirs.historical, &structure.id);
        let historical =
            read_historical_shortage(&path, config.historical_column).map_err(Arc::new);

        let historical_runs = match &historical {
            Ok(series) => series
                .annual_totals(config.months_per_year)
                .map(|totals| shortage_duration_runs_optional(totals.values()))
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        for design in &config.designs {
            let outcome = match &historical {
                Ok(series) => compute_panel(config, &analyzer, series, design, structure, dirs, &columns),
                Err(e) => Err(PanelError::Historical(Arc::clone(e))),
            };

            match &outcome {
                Ok(distribution) => info!(
                    structure = %structure.id,
                    design = %design.name,
                    members = distribution.members,
                    years = distribution.historical.len(),
                    "Computed panel"
                ),
                Err(e) => error!(
                    structure = %structure.id,
                    design = %design.name,
                    "Panel failed: {}", e
                ),
            }

            let panel = Panel {
                structure: structure.id.clone(),
                design: design.name.clone(),
                title: design.title.clone(),
                y_max: structure.y_max,
                historical_runs: historical_runs.clone(),
                outcome,
            };
            on_panel(&panel);
            panels.push(panel);
        }
    }

    Ok(panels)
}

fn compute_panel(
    config: &ExperimentConfig,
    analyzer: &ShortageDistributionAnalyzer,
    historical: &MonthlySeries,
    design: &DesignConfig,
    structure: &StructureConfig,
    dirs: InputDirs,
    columns: &[usize],
) -> Result<ShortageDistribution, PanelError> {
    let path = config.synthetic_path(dirs.synthetic, &design.name, &structure.id);
    let ensemble = load_synthetic_ensemble(&path, columns)?;

    let expected = config.expected_members(design);
    if ensemble.members() != expected {
        warn!(
            design = %design.name,
            found = ensemble.members(),
            expected,
            "Ensemble size differs from samples x realizations"
        );
    }

    let ensemble = ensemble.select(config.member_selection, design.samples)?;
    Ok(analyzer.analyze(historical, &ensemble)?)
}
