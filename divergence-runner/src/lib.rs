//! Divergence Runner: batch normalization, synthetic data, reports, artifacts.
//!
//! This crate builds on `divergence-core` to provide:
//! - Raw series loading with cache/synthetic fallback
//! - Per-symbol runs with input validation and score persistence
//! - Parallel batch runs that isolate per-symbol failures
//! - Finding summaries and structured finding logs
//! - CSV/JSON run artifacts with a versioned manifest

pub mod config;
pub mod data_loader;
pub mod export;
pub mod report;
pub mod runner;
pub mod synthetic;

pub use config::{PipelineConfig, SyntheticRange};
pub use data_loader::CacheLoader;
pub use export::{
    export_manifest_json, export_rows_csv, import_manifest_json, load_manifest, save_artifacts,
    RunManifest, SCHEMA_VERSION,
};
pub use report::{log_findings, FindingSummary};
pub use runner::{normalize_symbol, run_batch, BatchSummary, FailedSymbol, RunError, SymbolRun};
pub use synthetic::{generate_series, quarter_ends, write_synthetic, GeneratedSymbol};
