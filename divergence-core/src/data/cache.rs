//! Parquet cache of raw series with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{metric}.parquet`, one file per metric,
//! plus a `meta.json` sidecar per symbol describing each cached series.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check)
//! - Quarantine for corrupt files ({filename}.quarantined)
//! - Metadata sidecar per series (hash, date range, source)

use super::provider::{DataError, DataSource, SeriesLoader};
use crate::domain::{Metric, RawObservation};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// `NaiveDate::num_days_from_ce` of 1970-01-01, the Parquet date epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub(crate) fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

/// Metadata for one cached (symbol, metric) series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub symbol: String,
    pub metric: Metric,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// Cache status for one (symbol, metric) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub metric: Metric,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub count: Option<usize>,
    pub source: Option<DataSource>,
}

/// The Parquet cache.
pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory for a specific symbol: `{cache_dir}/symbol={SYMBOL}/`
    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn series_path(&self, symbol: &str, metric: Metric) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{metric}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Write one series to the cache, replacing any previous version.
    pub fn write(
        &self,
        symbol: &str,
        metric: Metric,
        observations: &[RawObservation],
        source: DataSource,
    ) -> Result<SeriesMeta, DataError> {
        let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
            return Err(DataError::CacheError("no observations to cache".into()));
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let df = observations_to_dataframe(observations)?;
        let path = self.series_path(symbol, metric);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = SeriesMeta {
            symbol: symbol.to_string(),
            metric,
            start_date: first.date.min(last.date),
            end_date: first.date.max(last.date),
            count: observations.len(),
            data_hash: series_hash(observations),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };

        let mut all_meta = self.read_meta(symbol);
        all_meta.retain(|m| m.metric != metric);
        all_meta.push(meta.clone());
        all_meta.sort_by_key(|m| m.metric);
        let meta_json = serde_json::to_string_pretty(&all_meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        tracing::debug!(symbol, %metric, count = meta.count, "cached series");
        Ok(meta)
    }

    /// Load a cached series. A series that was never cached loads as empty.
    pub fn load(&self, symbol: &str, metric: Metric) -> Result<Vec<RawObservation>, DataError> {
        let path = self.series_path(symbol, metric);
        if !path.exists() {
            return Ok(Vec::new());
        }

        match load_and_validate_parquet(&path) {
            Ok(observations) => Ok(observations),
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                tracing::warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, &quarantine);
                Ok(Vec::new())
            }
        }
    }

    /// Metadata of a cached series, if any.
    pub fn get_meta(&self, symbol: &str, metric: Metric) -> Option<SeriesMeta> {
        self.read_meta(symbol).into_iter().find(|m| m.metric == metric)
    }

    fn read_meta(&self, symbol: &str) -> Vec<SeriesMeta> {
        fs::read_to_string(self.meta_path(symbol))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Symbols with a partition directory in the cache, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("symbol="))
                    .map(str::to_string)
            })
            .collect();
        symbols.sort();
        symbols
    }

    /// Status of every metric for each requested symbol.
    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .flat_map(|sym| {
                let all_meta = self.read_meta(sym);
                Metric::ALL.into_iter().map(move |metric| {
                    let meta = all_meta.iter().find(|m| m.metric == metric);
                    CacheStatus {
                        symbol: sym.to_string(),
                        metric,
                        cached: meta.is_some(),
                        start_date: meta.map(|m| m.start_date),
                        end_date: meta.map(|m| m.end_date),
                        count: meta.map(|m| m.count),
                        source: meta.map(|m| m.source),
                    }
                })
            })
            .collect()
    }
}

impl SeriesLoader for ParquetCache {
    fn name(&self) -> &str {
        "parquet-cache"
    }

    fn load_raw(&self, symbol: &str, metric: Metric) -> Result<Vec<RawObservation>, DataError> {
        self.load(symbol, metric)
    }
}

/// BLAKE3 over dates and value bits, in stored order.
fn series_hash(observations: &[RawObservation]) -> String {
    let mut hasher = blake3::Hasher::new();
    for obs in observations {
        hasher.update(&date_to_epoch_days(obs.date).to_le_bytes());
        hasher.update(&obs.value.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Missing observations are stored as nulls.
fn observations_to_dataframe(observations: &[RawObservation]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = observations.iter().map(|o| date_to_epoch_days(o.date)).collect();
    let values: Vec<Option<f64>> = observations
        .iter()
        .map(|o| (!o.is_missing()).then_some(o.value))
        .collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("value".into(), values),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

pub(crate) fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

pub(crate) fn read_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<RawObservation>, DataError> {
    let df = read_parquet(path)?;
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let value_ca = df
        .column("value")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("value column type: {e}")))?;

    (0..df.height())
        .map(|i| {
            let date = date_ca
                .get(i)
                .and_then(epoch_days_to_date)
                .ok_or_else(|| DataError::ParquetError(format!("null or invalid date at row {i}")))?;
            Ok(RawObservation::new(date, value_ca.get(i).unwrap_or(f64::NAN)))
        })
        .collect()
}
