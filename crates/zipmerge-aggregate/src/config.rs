use std::path::PathBuf;

use crate::output::OutputFormat;

/// Configuration for one aggregation + merge run.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Cleaned product observations (CSV)
    pub product_path: PathBuf,
    /// Cleaned store locations (CSV)
    pub location_path: PathBuf,
    /// Processed census data, one row per ZIP (CSV)
    pub demographic_path: PathBuf,
    /// ZIP boundary geometry (GeoJSON or CSV), optional
    pub boundary_path: Option<PathBuf>,
    /// Final dataset path
    pub output_path: PathBuf,
    pub format: OutputFormat,
    /// zstd level, Parquet output only
    pub compression_level: i32,
    /// Directory for the intermediate tables, if they should be kept
    pub intermediate_dir: Option<PathBuf>,
    /// Tokens never counted as description keywords
    pub excluded_keywords: Vec<String>,
}
