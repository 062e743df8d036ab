pub use crate::analysis::analyzer::{ShortageDistribution, ShortageDistributionAnalyzer};
pub use crate::analysis::errors::ShapeError;
pub use crate::analysis::percentile::ScoreKind;
pub use crate::analysis::percentile_bands::{PercentileBand, PercentileBands, DEFAULT_PERCENTILE_LEVELS};
pub use crate::analysis::rank_curve::RankCurve;
pub use crate::config::{ConfigError, DesignConfig, ExperimentConfig, StructureConfig};
pub use crate::data::ensemble::{Ensemble, MemberSelection};
pub use crate::data::series::{AnnualSeries, MonthlySeries};
