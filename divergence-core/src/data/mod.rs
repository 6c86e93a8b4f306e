//! Raw data sources and score persistence.

pub mod cache;
pub mod ingest;
pub mod provider;
pub mod store;

pub use cache::{CacheStatus, ParquetCache, SeriesMeta};
pub use ingest::{import_csv, read_csv};
pub use provider::{DataError, DataSource, MemoryLoader, SeriesLoader};
pub use store::{MemoryStore, ParquetScoreStore, ScoreStore};
