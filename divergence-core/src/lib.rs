//! Divergence Core: normalization of mixed-frequency financial series.
//!
//! This crate turns three raw series per symbol into one comparable daily table:
//! - Domain types (observations, scores, merged cells, quality findings)
//! - Outlier conditioning by global winsorization
//! - Skewness-gated choice between mean/std and median/MAD standardization
//! - Rolling standardization in each metric's native cadence
//! - Cross-frequency merge with bounded forward-fill
//! - Advisory quality audit of the merged output
//! - Raw data sources (CSV import, Parquet cache) and score persistence

pub mod config;
pub mod data;
pub mod domain;
pub mod normalize;

pub use config::{ConfigError, NormalizationConfig, SeriesSpec, Timeline};
pub use normalize::{NormalizationOutput, NormalizeError, Normalizer, SeriesReport};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared across batch worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::RawObservation>();
        require_sync::<domain::RawObservation>();
        require_send::<domain::MergedRow>();
        require_sync::<domain::MergedRow>();
        require_send::<domain::QualityFinding>();
        require_sync::<domain::QualityFinding>();
        require_send::<NormalizationConfig>();
        require_sync::<NormalizationConfig>();
        require_send::<Normalizer>();
        require_sync::<Normalizer>();
        require_send::<NormalizationOutput>();
        require_sync::<NormalizationOutput>();

        require_send::<data::ParquetCache>();
        require_sync::<data::ParquetCache>();
        require_send::<data::MemoryLoader>();
        require_sync::<data::MemoryLoader>();
        require_send::<data::MemoryStore>();
        require_sync::<data::MemoryStore>();
        require_send::<data::ParquetScoreStore>();
        require_sync::<data::ParquetScoreStore>();
        require_send::<NormalizeError>();
        require_sync::<NormalizeError>();
    }
}
