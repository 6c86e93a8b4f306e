//! Run artifacts: merged score CSV and a JSON run manifest.
//!
//! Layout: `{output_dir}/{SYMBOL}/scores.csv` and `{output_dir}/{SYMBOL}/manifest.json`.
//! Manifests carry a `schema_version`; unknown versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use divergence_core::data::DataSource;
use divergence_core::domain::{Cell, DatasetHash, MergedRow, Metric, QualityFinding};
use divergence_core::normalize::SeriesReport;
use serde::{Deserialize, Serialize};

use crate::report::FindingSummary;
use crate::runner::SymbolRun;

pub const SCHEMA_VERSION: u32 = 1;

/// Provenance and outcome of one symbol's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub symbol: String,
    pub row_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub dataset_hash: DatasetHash,
    pub config_hash: String,
    pub source: Option<DataSource>,
    pub series: Vec<SeriesReport>,
    pub summary: FindingSummary,
    pub findings: Vec<QualityFinding>,
}

impl RunManifest {
    pub fn new(run: &SymbolRun, config_hash: &str, source: Option<DataSource>) -> Self {
        let range = run.date_range();
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: run.symbol.clone(),
            row_count: run.rows.len(),
            start_date: range.map(|r| r.0),
            end_date: range.map(|r| r.1),
            dataset_hash: run.dataset_hash.clone(),
            config_hash: config_hash.to_string(),
            source,
            series: run.series.clone(),
            summary: run.summary(),
            findings: run.findings.clone(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == Some(DataSource::Synthetic)
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

fn fill_flag(cell: Cell) -> &'static str {
    match cell {
        Cell::Observed { .. } => "observed",
        Cell::Filled { .. } => "filled",
        Cell::Undefined => "undefined",
    }
}

/// Export merged rows as CSV.
///
/// Columns: date, price_z, holdings_z, search_z, then one `{metric}_fill`
/// flag per metric. Undefined scores are empty fields.
pub fn export_rows_csv(rows: &[MergedRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(Metric::ALL.iter().map(|m| m.score_column().to_string()));
    header.extend(Metric::ALL.iter().map(|m| format!("{m}_fill")));
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.date.to_string()];
        for metric in Metric::ALL {
            record.push(
                row.cell(metric)
                    .value()
                    .map(|z| format!("{z:.6}"))
                    .unwrap_or_default(),
            );
        }
        for metric in Metric::ALL {
            record.push(fill_flag(row.cell(metric)).to_string());
        }
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize RunManifest to JSON")
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize RunManifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Artifacts on disk ──────────────────────────────────────────────

/// Write `scores.csv` and `manifest.json` for one run. Returns the run directory.
pub fn save_artifacts(run: &SymbolRun, manifest: &RunManifest, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&run.symbol);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;

    std::fs::write(run_dir.join("scores.csv"), export_rows_csv(&run.rows)?)
        .context("failed to write scores.csv")?;
    std::fs::write(run_dir.join("manifest.json"), export_manifest_json(manifest)?)
        .context("failed to write manifest.json")?;

    Ok(run_dir)
}

pub fn load_manifest(run_dir: &Path) -> Result<RunManifest> {
    let path = run_dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}
