//! Serializable pipeline configuration.
//!
//! ```toml
//! symbols = ["SPY", "TSLA"]
//! data_dir = "data/cache"
//! output_dir = "data/output"
//!
//! [normalization]
//! skew_threshold = 1.5
//! timeline = "calendar"
//!
//! [normalization.search]
//! cadence = "weekly"
//! window = 4
//! min_periods = 4
//! max_gap_days = 7
//!
//! [synthetic]
//! start = "2023-01-01"
//! end = "2024-12-31"
//! ```

use chrono::NaiveDate;
use divergence_core::config::{ConfigError, NormalizationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Date range used when synthetic series are generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for SyntheticRange {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

/// Everything a batch run needs besides the symbols given on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalization: NormalizationConfig,
    /// Symbols to normalize when none are given explicitly.
    pub symbols: Vec<String>,
    /// Root of the raw-series Parquet cache.
    pub data_dir: PathBuf,
    /// Where score tables and run artifacts are written.
    pub output_dir: PathBuf,
    pub synthetic: SyntheticRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationConfig::default(),
            symbols: Vec::new(),
            data_dir: PathBuf::from("data/cache"),
            output_dir: PathBuf::from("data/output"),
            synthetic: SyntheticRange::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalization.validate()?;
        if self.synthetic.start > self.synthetic.end {
            return Err(ConfigError::Parse(format!(
                "synthetic range start {} is after end {}",
                self.synthetic.start, self.synthetic.end
            )));
        }
        Ok(())
    }

    /// Deterministic hash of the configuration, recorded in run manifests.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(&self.normalization).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
