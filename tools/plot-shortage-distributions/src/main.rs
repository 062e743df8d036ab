mod panels;
mod plots;
mod summary;

use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use panels::{compute_panels, InputDirs, Panel};
use shortage_distributions::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the plain-text summary written next to the figure.
const SUMMARY_FILE_NAME: &str = "shortage-distributions.txt";

/// Name of the JSON export written with `--json`.
const JSON_FILE_NAME: &str = "shortage-distributions.json";

/// Compares the annual shortage distributions of experimental designs against the historical record
#[derive(FromArgs, Debug)]
pub struct Args {
    /// experiment configuration (TOML); the published figure is reproduced when omitted
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// directory holding the historical `<structure>_info_hist.txt` tables
    #[argh(option, short = 'H', default = "PathBuf::from(\".\")")]
    historical_dir: PathBuf,

    /// directory holding one subdirectory of `<structure>_info.npy` arrays per design
    #[argh(option, short = 's', default = "PathBuf::from(\".\")")]
    synthetic_dir: PathBuf,

    /// directory the figure and summaries are written to
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output_dir: PathBuf,

    /// also export every computed curve as JSON
    #[argh(switch, short = 'j')]
    json: bool,
}

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Analysis error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Plotting error: {0}")]
    Plot(#[from] plots::PlotError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("All {0} panels failed")]
    AllPanelsFailed(usize),
}

type Result<T> = core::result::Result<T, AnalysisError>;

/// Sets up `tracing` output, honouring `RUST_LOG` when set.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    init_logging();
    let args: Args = argh::from_env();

    if let Err(e) = run(&args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ExperimentConfig::from_file(path)?,
        None => ExperimentConfig::default(),
    };

    fs::create_dir_all(&args.output_dir)?;
    let dirs = InputDirs {
        historical: &args.historical_dir,
        synthetic: &args.synthetic_dir,
    };

    let total = config.structures.len() * config.designs.len();
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let panels = compute_panels(&config, dirs, |panel| {
        progress.set_message(format!("{} / {}", panel.structure, panel.design));
        progress.inc(1);
    })?;
    progress.finish_and_clear();

    let failed = panels.iter().filter(|panel| panel.is_failed()).count();
    if failed == panels.len() {
        return Err(AnalysisError::AllPanelsFailed(failed));
    }

    write_outputs(&panels, &config, &args.output_dir, args.json)?;
    info!(
        computed = panels.len() - failed,
        failed,
        output = %args.output_dir.display(),
        "Finished"
    );

    Ok(())
}

fn write_outputs(panels: &[Panel], config: &ExperimentConfig, output_dir: &Path, json: bool) -> Result<()> {
    let figure_path = output_dir.join(&config.figure.file_name);
    plots::render_figure(panels, config, &figure_path)?;
    info!(path = %figure_path.display(), "Saved figure");

    let summary_path = output_dir.join(SUMMARY_FILE_NAME);
    summary::write_summary(panels, &summary_path)?;
    info!(path = %summary_path.display(), "Saved summary");

    if json {
        let json_path = output_dir.join(JSON_FILE_NAME);
        fs::write(&json_path, serde_json::to_string_pretty(panels)?)?;
        info!(path = %json_path.display(), "Exported curves");
    }

    Ok(())
}
