//! Raw series resolution for the runner.
//!
//! Implements the fallback policy per symbol:
//! 1. If the cache holds any series for the symbol → use the cache
//! 2. If nothing is cached and synthetic mode is on → generate synthetic series (tagged)
//! 3. Otherwise → empty series, which the normalizer reports as unavailable data
//!
//! Synthetic data is a developer-only debug mode.

use crate::config::SyntheticRange;
use crate::synthetic::generate_series;
use divergence_core::data::{DataError, DataSource, ParquetCache, SeriesLoader};
use divergence_core::domain::{Metric, RawObservation};

/// Loader over the Parquet cache with optional synthetic fallback.
pub struct CacheLoader {
    cache: ParquetCache,
    synthetic: Option<SyntheticRange>,
}

impl CacheLoader {
    pub fn new(cache: ParquetCache) -> Self {
        Self {
            cache,
            synthetic: None,
        }
    }

    /// Generate synthetic series over `range` for symbols with nothing cached.
    pub fn with_synthetic(mut self, range: SyntheticRange) -> Self {
        self.synthetic = Some(range);
        self
    }

    pub fn cache(&self) -> &ParquetCache {
        &self.cache
    }

    fn has_cached(&self, symbol: &str) -> bool {
        Metric::ALL
            .into_iter()
            .any(|metric| self.cache.get_meta(symbol, metric).is_some())
    }

    /// Where data for `symbol` will come from. Cached series written as
    /// synthetic keep their synthetic tag.
    pub fn source_of(&self, symbol: &str) -> Option<DataSource> {
        let cached: Vec<DataSource> = Metric::ALL
            .into_iter()
            .filter_map(|metric| self.cache.get_meta(symbol, metric))
            .map(|meta| meta.source)
            .collect();
        if cached.contains(&DataSource::Synthetic) {
            Some(DataSource::Synthetic)
        } else if !cached.is_empty() {
            Some(DataSource::Cache)
        } else if self.synthetic.is_some() {
            Some(DataSource::Synthetic)
        } else {
            None
        }
    }
}

impl SeriesLoader for CacheLoader {
    fn name(&self) -> &str {
        if self.synthetic.is_some() {
            "cache+synthetic"
        } else {
            "cache"
        }
    }

    fn load_raw(&self, symbol: &str, metric: Metric) -> Result<Vec<RawObservation>, DataError> {
        match (self.has_cached(symbol), self.synthetic) {
            (false, Some(range)) => {
                tracing::warn!(symbol, %metric, "generating synthetic data; results are tagged as synthetic");
                Ok(generate_series(symbol, range.start, range.end).get(metric).to_vec())
            }
            _ => self.cache.load(symbol, metric),
        }
    }
}
