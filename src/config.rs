//! Experiment configuration.
//!
//! Describes which experimental designs and structures are compared, where their
//! simulation outputs live, and how the figure is laid out. Every field has a default,
//! so an empty TOML file reproduces the published shortage distribution figure.

use crate::analysis::annual_totals::MONTHS_PER_YEAR;
use crate::analysis::percentile::validate_level;
use crate::analysis::percentile_bands::DEFAULT_PERCENTILE_LEVELS;
use crate::data::ensemble::MemberSelection;
use crate::io::historical::HISTORICAL_SHORTAGE_COLUMN;
use crate::io::synthetic::ColumnRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = core::result::Result<T, ConfigError>;

/// An experimental design (sampling strategy) whose ensemble is compared against history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignConfig {
    /// Directory name of the design's simulation outputs.
    pub name: String,
    /// Panel title.
    pub title: String,
    /// Number of sampled parameter sets (states of the world).
    pub samples: usize,
}

/// A water-supply structure, plotted as one row of panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Structure identifier, used in file names.
    pub id: String,
    /// Upper limit of the y axis; derived from the data when absent.
    #[serde(default)]
    pub y_max: Option<f64>,
}

/// Output figure settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: String,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            file_name: "Figure6_ShortageDistns.png".to_string(),
            width: 1600,
            height: 800,
            x_label: "Percentile".to_string(),
            y_label: "Annual Shortage (m³)".to_string(),
            legend_title: "Frequency in experiment".to_string(),
        }
    }
}

/// Complete description of a shortage distribution comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub months_per_year: usize,
    /// Stochastic realizations generated per sampled parameter set.
    pub realizations: usize,
    /// Column of the historical table holding the shortage.
    pub historical_column: usize,
    /// Variable columns of the synthetic arrays holding the shortage.
    pub shortage_columns: ColumnRange,
    pub percentile_levels: Vec<f64>,
    pub member_selection: MemberSelection,
    /// File name of a historical table; `{structure}` is substituted.
    pub historical_file: String,
    /// Path of a synthetic array relative to the synthetic directory;
    /// `{design}` and `{structure}` are substituted.
    pub synthetic_file: String,
    pub designs: Vec<DesignConfig>,
    pub structures: Vec<StructureConfig>,
    pub figure: FigureConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let design = |name: &str, title: &str, samples: usize| DesignConfig {
            name: name.to_string(),
            title: title.to_string(),
            samples,
        };

        Self {
            months_per_year: MONTHS_PER_YEAR,
            realizations: 10,
            historical_column: HISTORICAL_SHORTAGE_COLUMN,
            shortage_columns: ColumnRange::default(),
            percentile_levels: DEFAULT_PERCENTILE_LEVELS.to_vec(),
            member_selection: MemberSelection::default(),
            historical_file: "{structure}_info_hist.txt".to_string(),
            synthetic_file: "{design}/{structure}_info.npy".to_string(),
            designs: vec![
                design("LHsamples_original_1000_AnnQonly", "Box Around Historical", 1000),
                design("CMIPunscaled_SOWs", "CMIP", 97),
                design("Paleo_SOWs", "Paleo", 366),
                design("LHsamples_wider_1000_AnnQonly", "All-Encompassing", 1000),
            ],
            structures: vec![
                StructureConfig {
                    id: "53_ADC022".to_string(),
                    y_max: Some(5000.0),
                },
                StructureConfig {
                    id: "7200645".to_string(),
                    y_max: Some(260000.0),
                },
            ],
            figure: FigureConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Loads and validates a configuration file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(file_path)?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values which would make every panel fail.
    pub fn validate(&self) -> Result<()> {
        if self.months_per_year == 0 {
            return Err(ConfigError::Invalid("months_per_year must be non-zero".to_string()));
        }

        if self.designs.is_empty() {
            return Err(ConfigError::Invalid("at least one design is required".to_string()));
        }

        if self.structures.is_empty() {
            return Err(ConfigError::Invalid("at least one structure is required".to_string()));
        }

        if let Some(design) = self.designs.iter().find(|d| d.samples == 0) {
            return Err(ConfigError::Invalid(format!(
                "design '{}' has no samples",
                design.name
            )));
        }

        if self.shortage_columns.indices().is_empty() {
            return Err(ConfigError::Invalid("shortage_columns selects no columns".to_string()));
        }

        if self.figure.width == 0 || self.figure.height == 0 {
            return Err(ConfigError::Invalid(
                "figure width and height must be non-zero".to_string(),
            ));
        }

        for &level in &self.percentile_levels {
            validate_level(level).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        Ok(())
    }

    /// Path of the historical table of `structure`.
    pub fn historical_path(&self, historical_dir: &Path, structure: &str) -> PathBuf {
        historical_dir.join(self.historical_file.replace("{structure}", structure))
    }

    /// Path of the synthetic array of (`design`, `structure`).
    pub fn synthetic_path(&self, synthetic_dir: &Path, design: &str, structure: &str) -> PathBuf {
        synthetic_dir.join(
            self.synthetic_file
                .replace("{design}", design)
                .replace("{structure}", structure),
        )
    }

    /// Number of ensemble members expected after extraction, before selection.
    pub fn expected_members(&self, design: &DesignConfig) -> usize {
        design.samples * self.realizations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_file_reproduces_defaults() {
        let config = ExperimentConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExperimentConfig::default());
        assert_eq!(config.designs.len(), 4);
        assert_eq!(config.designs[1].samples, 97);
        assert_eq!(config.structures[1].y_max, Some(260000.0));
        assert_eq!(config.member_selection, MemberSelection::FirstRealization);
    }

    #[test]
    fn overrides_fields() {
        let text = r#"
            member_selection = "all"
            percentile_levels = [90.0, 50.0, 10.0]

            [[designs]]
            name = "Paleo_SOWs"
            title = "Paleo"
            samples = 366

            [[structures]]
            id = "7200645"

            [figure]
            file_name = "paleo.png"
        "#;

        let config = ExperimentConfig::from_toml_str(text).unwrap();
        assert_eq!(config.member_selection, MemberSelection::All);
        assert_eq!(config.percentile_levels, vec![90.0, 50.0, 10.0]);
        assert_eq!(config.designs.len(), 1);
        assert_eq!(config.structures[0].y_max, None);
        assert_eq!(config.figure.file_name, "paleo.png");
        assert_eq!(config.figure.width, 1600);
        assert_eq!(config.months_per_year, 12);
    }

    #[rstest]
    #[case::no_designs("designs = []")]
    #[case::no_structures("structures = []")]
    #[case::zero_period("months_per_year = 0")]
    #[case::bad_level("percentile_levels = [120.0]")]
    #[case::zero_step("shortage_columns = { start = 2, end = 22, step = 0 }")]
    #[case::zero_samples("[[designs]]\nname = \"x\"\ntitle = \"x\"\nsamples = 0")]
    #[case::zero_width("[figure]\nwidth = 0")]
    #[case::zero_height("[figure]\nheight = 0")]
    fn rejects_invalid_configs(#[case] text: &str) {
        assert!(matches!(
            ExperimentConfig::from_toml_str(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            ExperimentConfig::from_toml_str("designs = ["),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn substitutes_paths() {
        let config = ExperimentConfig::default();
        assert_eq!(
            config.historical_path(Path::new("hist"), "53_ADC022"),
            PathBuf::from("hist/53_ADC022_info_hist.txt")
        );
        assert_eq!(
            config.synthetic_path(Path::new("syn"), "Paleo_SOWs", "7200645"),
            PathBuf::from("syn/Paleo_SOWs/7200645_info.npy")
        );
        assert_eq!(config.expected_members(&config.designs[2]), 3660);
    }

    #[test]
    fn reads_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "realizations = 5").unwrap();
        let config = ExperimentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.realizations, 5);
    }
}
