//! Per-symbol and batch normalization runs.
//!
//! A run loads raw series, validates them, normalizes, persists the merged
//! table and logs every finding. Batches run symbols in parallel; one failing
//! symbol never aborts the others.

use crate::report::{log_findings, FindingSummary};
use chrono::NaiveDate;
use divergence_core::data::{DataError, ScoreStore, SeriesLoader};
use divergence_core::domain::{DatasetHash, MergedRow, QualityFinding};
use divergence_core::normalize::{load_series, validate_set, NormalizeError, SeriesReport};
use divergence_core::Normalizer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("failed to store scores for '{symbol}': {source}")]
    Store {
        symbol: String,
        #[source]
        source: DataError,
    },
}

/// Everything produced for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRun {
    pub symbol: String,
    pub rows: Vec<MergedRow>,
    /// Validator findings on the raw input, then pipeline findings.
    pub findings: Vec<QualityFinding>,
    pub series: Vec<SeriesReport>,
    pub dataset_hash: DatasetHash,
}

impl SymbolRun {
    pub fn summary(&self) -> FindingSummary {
        FindingSummary::from_findings(&self.findings)
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date, self.rows.last()?.date))
    }
}

/// Normalize one symbol and upsert its merged table into `store`.
pub fn normalize_symbol(
    symbol: &str,
    normalizer: &Normalizer,
    loader: &dyn SeriesLoader,
    store: &dyn ScoreStore,
) -> Result<SymbolRun, RunError> {
    let raw = load_series(symbol, loader)?;
    let mut findings = validate_set(&raw);
    let output = normalizer.normalize_series(symbol, raw)?;
    findings.extend(output.findings);

    store
        .upsert(symbol, &output.rows)
        .map_err(|source| RunError::Store {
            symbol: symbol.to_string(),
            source,
        })?;

    log_findings(symbol, &findings);
    tracing::info!(
        symbol,
        rows = output.rows.len(),
        findings = findings.len(),
        loader = loader.name(),
        "normalized"
    );

    Ok(SymbolRun {
        symbol: output.symbol,
        rows: output.rows,
        findings,
        series: output.series,
        dataset_hash: output.dataset_hash,
    })
}

/// A symbol that failed, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of a batch run, in input symbol order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub runs: Vec<SymbolRun>,
    pub failed: Vec<FailedSymbol>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.runs.len()
    }

    pub fn total_rows(&self) -> usize {
        self.runs.iter().map(|r| r.rows.len()).sum()
    }

    pub fn findings(&self) -> FindingSummary {
        FindingSummary::from_findings(self.runs.iter().flat_map(|r| &r.findings))
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Normalize many symbols in parallel.
pub fn run_batch(
    symbols: &[String],
    normalizer: &Normalizer,
    loader: &dyn SeriesLoader,
    store: &dyn ScoreStore,
) -> BatchSummary {
    let results: Vec<(String, Result<SymbolRun, RunError>)> = symbols
        .par_iter()
        .map(|symbol| {
            let result = normalize_symbol(symbol, normalizer, loader, store);
            (symbol.clone(), result)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (symbol, result) in results {
        match result {
            Ok(run) => summary.runs.push(run),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "symbol failed");
                summary.failed.push(FailedSymbol {
                    symbol,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        succeeded = summary.succeeded(),
        failed = summary.failed.len(),
        total_rows = summary.total_rows(),
        "batch complete"
    );
    summary
}
