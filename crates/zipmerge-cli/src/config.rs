//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use zipmerge_aggregate::keywords::DEFAULT_EXCLUDED;
use zipmerge_aggregate::{AggregateConfig, OutputFormat};
use zipmerge_prep::{CategoryRule, Classifier};

/// Global configuration for zipmerge
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub output: OutputConfig,
    pub prep: PrepConfig,
}

/// Where every table lives. File names are relative to `dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub raw_products: String,
    pub products: String,
    pub raw_locations: String,
    pub locations: String,
    pub raw_census: String,
    pub census: String,
    pub boundaries: String,
    pub output: String,
    pub intermediate_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            raw_products: "kroger_product_data.csv".to_string(),
            products: "cleaned_product_data.csv".to_string(),
            raw_locations: "kroger_locations.csv".to_string(),
            locations: "cleaned_location_data.csv".to_string(),
            raw_census: "cleaned_census_data.csv".to_string(),
            census: "processed_census_data.csv".to_string(),
            boundaries: "zcta_boundaries.geojson".to_string(),
            output: "final_dataset.csv".to_string(),
            intermediate_dir: "intermediate".to_string(),
        }
    }
}

impl DataConfig {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub compression_level: i32,
    pub write_intermediate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            compression_level: 3,
            write_intermediate: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryEntry {
    pub pattern: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrepConfig {
    pub location_id_width: usize,
    /// Ordered classification rules; first match wins
    pub categories: Vec<CategoryEntry>,
    pub fallback_category: String,
    /// Tokens never counted as description keywords
    pub excluded_keywords: Vec<String>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        let classifier = Classifier::default();
        Self {
            location_id_width: 8,
            categories: classifier
                .rules()
                .iter()
                .map(|r| CategoryEntry {
                    pattern: r.pattern.clone(),
                    category: r.category.clone(),
                })
                .collect(),
            fallback_category: "Other".to_string(),
            excluded_keywords: DEFAULT_EXCLUDED.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl PrepConfig {
    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.categories
                .iter()
                .map(|c| CategoryRule::new(&c.pattern, &c.category))
                .collect(),
            &self.fallback_category,
        )
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./zipmerge.toml (current directory)
    /// 2. ~/.config/zipmerge/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("zipmerge.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "zipmerge") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data.path(&self.data.output)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.data.path(&self.data.boundaries)
    }

    pub fn intermediate_path(&self) -> PathBuf {
        self.data.path(&self.data.intermediate_dir)
    }

    /// Engine configuration over the cleaned tables.
    pub fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            product_path: self.data.path(&self.data.products),
            location_path: self.data.path(&self.data.locations),
            demographic_path: self.data.path(&self.data.census),
            boundary_path: Some(self.boundary_path()),
            output_path: self.output_path(),
            format: self.output.format,
            compression_level: self.output.compression_level,
            intermediate_dir: self
                .output
                .write_intermediate
                .then(|| self.intermediate_path()),
            excluded_keywords: self.prep.excluded_keywords.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.data.dir, PathBuf::from("./data"));
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.output.compression_level, 3);
        assert_eq!(config.prep.location_id_width, 8);
        assert_eq!(
            config.output_path(),
            PathBuf::from("./data/final_dataset.csv")
        );
        assert_eq!(config.prep.classifier().classify("Whole Wheat Bread"), "Bread");
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[data]
dir = "/tmp/grocery"
output = "final.parquet"

[output]
format = "parquet"
compression_level = 9
write_intermediate = true

[prep]
location_id_width = 6
fallback_category = "Misc"
categories = [
  { pattern = "MILK", category = "Dairy" },
  { pattern = "egg", category = "Egg" },
]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.data.dir, PathBuf::from("/tmp/grocery"));
        assert_eq!(config.data.products, "cleaned_product_data.csv");
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.prep.location_id_width, 6);

        let classifier = config.prep.classifier();
        assert_eq!(classifier.classify("2% Milk"), "Dairy");
        assert_eq!(classifier.classify("Sourdough Bread"), "Misc");

        let agg = config.aggregate_config();
        assert_eq!(agg.output_path, PathBuf::from("/tmp/grocery/final.parquet"));
        assert_eq!(agg.intermediate_dir, Some(PathBuf::from("/tmp/grocery/intermediate")));
        assert_eq!(agg.excluded_keywords, vec!["egg", "eggs", "bread"]);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = toml::from_str::<Config>("[output]\nformat = \"xlsx\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zipmerge.toml");
        std::fs::write(&path, "[output]\nwrite_intermediate = true\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(config.output.write_intermediate);
        assert_eq!(config.data.output, "final_dataset.csv");
    }
}
