//! Configuration management and validation.
//!
//! Provides the pipeline [`Settings`] (missing-value convention, output naming,
//! storage tuning) and [`PipelineConfig`], which loads a complete configuration
//! document holding the settings, the `export` section and the `output`
//! description.

use crate::app::services::encoder::Description;
use crate::app::services::export::Export;
use crate::app::models::MissingValue;
use crate::constants::{
    DEFAULT_LOCATION_DIMENSION, DEFAULT_ROW_GROUP_SIZE, MISSING_EPSILON, MISSING_VALUE,
};
use crate::schema::{ConfKey, ConfNode, DOCUMENT_KEYS};
use crate::{Error, Result};
use polars::prelude::{ParquetCompression, StatisticsOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Supported compression algorithms for parquet output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Pipeline-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Sentinel the decoder writes for "no observation"
    pub missing_value: f64,

    /// Tolerance below the sentinel still treated as missing
    pub missing_epsilon: f64,

    /// Name of the per-record output dimension
    pub location_dimension: String,

    /// Compression algorithm for parquet output
    pub compression: CompressionAlgorithm,

    /// Rows per parquet row group
    pub row_group_size: usize,

    /// Enable column statistics in parquet output
    pub enable_statistics: bool,

    /// Skip partitions left without rows instead of writing empty outputs
    pub skip_empty_partitions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missing_value: MISSING_VALUE,
            missing_epsilon: MISSING_EPSILON,
            location_dimension: DEFAULT_LOCATION_DIMENSION.to_string(),
            compression: CompressionAlgorithm::default(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            enable_statistics: true,
            skip_empty_partitions: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings with a custom missing-value convention
    pub fn with_missing_value(mut self, sentinel: f64, epsilon: f64) -> Self {
        self.missing_value = sentinel;
        self.missing_epsilon = epsilon;
        self
    }

    /// Create settings with a custom location dimension name
    pub fn with_location_dimension(mut self, name: impl Into<String>) -> Self {
        self.location_dimension = name.into();
        self
    }

    /// Create settings with a custom compression algorithm
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Create settings with a custom row group size
    pub fn with_row_group_size(mut self, row_group_size: usize) -> Self {
        self.row_group_size = row_group_size;
        self
    }

    /// Write empty partitions instead of skipping them
    pub fn with_empty_partitions(mut self) -> Self {
        self.skip_empty_partitions = false;
        self
    }

    /// Missing-value policy described by these settings
    pub fn missing(&self) -> MissingValue {
        MissingValue::new(self.missing_value, self.missing_epsilon)
    }

    /// Column statistics option for the parquet writer
    pub fn statistics(&self) -> StatisticsOptions {
        if self.enable_statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        }
    }

    /// Check the settings for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.missing_value.is_finite() {
            return Err(Error::configuration("missingValue must be a finite number"));
        }
        if !self.missing_epsilon.is_finite() || self.missing_epsilon < 0.0 {
            return Err(Error::configuration(
                "missingEpsilon must be a finite, non-negative number",
            ));
        }
        if self.location_dimension.trim().is_empty() {
            return Err(Error::configuration("locationDimension must not be empty"));
        }
        if self.row_group_size == 0 {
            return Err(Error::configuration("rowGroupSize must be positive"));
        }
        Ok(())
    }
}

/// Complete pipeline configuration document
///
/// ```json
/// { "settings": { ... }, "export": { ... }, "output": { ... } }
/// ```
///
/// `settings` is optional; `export` and `output` are required.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub settings: Settings,
    pub export: Export,
    pub description: Description,
}

impl PipelineConfig {
    /// Build from an already parsed configuration tree
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = ConfNode::new(value, "");
        root.validate(DOCUMENT_KEYS)?;

        let settings: Settings = match root.get(ConfKey::Settings) {
            Some(node) => serde_json::from_value(node.value().clone())?,
            None => Settings::default(),
        };
        settings.validate()?;

        let export = Export::from_conf(&root.child(ConfKey::Export)?)?;
        let description = Description::from_conf(&root.child(ConfKey::Output)?, &export, &settings)?;

        debug!(
            "Loaded pipeline configuration: {} output variables",
            description.variables().len()
        );

        Ok(Self {
            settings,
            export,
            description,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Load a JSON configuration document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("Failed to read configuration file {}", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn document() -> Value {
        json!({
            "settings": { "missingValue": 1.0e10, "compression": "zstd" },
            "export": {
                "variables": { "latitude": { "mnemonic": "CLAT" } }
            },
            "output": {
                "variables": [ { "name": "MetaData/latitude", "source": "variables/latitude" } ]
            }
        })
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.missing_value, 1.0e11);
        assert_eq!(settings.location_dimension, "Location");
        assert_eq!(settings.compression, CompressionAlgorithm::Snappy);
        assert!(settings.skip_empty_partitions);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_builders() {
        let settings = Settings::new()
            .with_missing_value(1.0e10, 0.5)
            .with_location_dimension("nlocs")
            .with_compression(CompressionAlgorithm::Lz4)
            .with_row_group_size(10)
            .with_empty_partitions();

        assert_eq!(settings.missing(), MissingValue::new(1.0e10, 0.5));
        assert_eq!(settings.location_dimension, "nlocs");
        assert!(matches!(
            settings.compression.to_polars_compression(),
            ParquetCompression::Lz4Raw
        ));
        assert_eq!(settings.row_group_size, 10);
        assert!(!settings.skip_empty_partitions);
    }

    #[test]
    fn test_settings_validation() {
        assert!(Settings::new().with_row_group_size(0).validate().is_err());
        assert!(Settings::new().with_location_dimension(" ").validate().is_err());
        assert!(
            Settings::new()
                .with_missing_value(f64::INFINITY, 0.0)
                .validate()
                .is_err()
        );
        assert!(
            Settings::new()
                .with_missing_value(1.0e11, -1.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: Settings =
            serde_json::from_value(json!({ "locationDimension": "nlocs" })).unwrap();
        assert_eq!(settings.location_dimension, "nlocs");
        assert_eq!(settings.row_group_size, DEFAULT_ROW_GROUP_SIZE);
    }

    #[test]
    fn test_pipeline_config_from_value() {
        let config = PipelineConfig::from_value(&document()).unwrap();

        assert_eq!(config.settings.missing_value, 1.0e10);
        assert_eq!(config.settings.compression, CompressionAlgorithm::Zstd);
        assert_eq!(config.export.variables().len(), 1);
        assert_eq!(config.description.variables().len(), 1);
    }

    #[test]
    fn test_pipeline_config_requires_sections() {
        let no_output = json!({ "export": { "variables": { "lat": { "mnemonic": "CLAT" } } } });
        match PipelineConfig::from_value(&no_output) {
            Err(Error::MissingRequiredConfig { path }) => assert_eq!(path, "output"),
            other => panic!("expected missing output, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_config_bad_settings() {
        let mut value = document();
        value["settings"] = json!({ "rowGroupSize": "big" });
        assert!(matches!(
            PipelineConfig::from_value(&value),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_pipeline_config_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", document()).unwrap();

        let config = PipelineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.export.variables().len(), 1);

        assert!(matches!(
            PipelineConfig::from_path(Path::new("/nonexistent/pipeline.json")),
            Err(Error::Io { .. })
        ));
    }
}
