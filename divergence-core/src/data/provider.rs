//! Series loader trait and structured error types.
//!
//! The SeriesLoader trait abstracts over raw data sources (Parquet cache, CSV
//! import, in-memory fixtures) so the normalizer never knows where data lives.

use crate::domain::{Metric, RawObservation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid CSV at line {line}: {message}")]
    InvalidCsv { line: u64, message: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a raw series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvImport,
    Cache,
    Memory,
    Synthetic,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::CsvImport => "csv_import",
            DataSource::Cache => "cache",
            DataSource::Memory => "memory",
            DataSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Supplies raw observations for a (symbol, metric) pair.
///
/// Implementations return observations in whatever order the source holds
/// them; the normalizer canonicalizes. An empty vector means "no data" and is
/// not an error.
pub trait SeriesLoader: Send + Sync {
    /// Human-readable name of this loader.
    fn name(&self) -> &str;

    fn load_raw(&self, symbol: &str, metric: Metric) -> Result<Vec<RawObservation>, DataError>;
}

/// In-memory loader keyed by (symbol, metric).
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    series: HashMap<(String, Metric), Vec<RawObservation>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, metric: Metric, observations: Vec<RawObservation>) {
        self.series.insert((symbol.to_string(), metric), observations);
    }

    pub fn with(mut self, symbol: &str, metric: Metric, observations: Vec<RawObservation>) -> Self {
        self.insert(symbol, metric, observations);
        self
    }
}

impl SeriesLoader for MemoryLoader {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_raw(&self, symbol: &str, metric: Metric) -> Result<Vec<RawObservation>, DataError> {
        Ok(self
            .series
            .get(&(symbol.to_string(), metric))
            .cloned()
            .unwrap_or_default())
    }
}
