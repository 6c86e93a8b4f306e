//! Persistence of merged score tables.
//!
//! Rows are keyed by (symbol, date). Writing a row whose key already exists
//! replaces it, so re-running a symbol over unchanged input is idempotent.

use super::cache::{date_to_epoch_days, epoch_days_to_date, read_parquet, write_parquet};
use super::provider::DataError;
use crate::domain::{Cell, MergedRow, Metric};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sink for merged score rows.
pub trait ScoreStore: Send + Sync {
    /// Insert rows, replacing any stored row with the same (symbol, date).
    fn upsert(&self, symbol: &str, rows: &[MergedRow]) -> Result<(), DataError>;

    /// All stored rows for a symbol in ascending date order.
    fn load(&self, symbol: &str) -> Result<Vec<MergedRow>, DataError>;
}

fn merge_rows(existing: Vec<MergedRow>, rows: &[MergedRow]) -> Vec<MergedRow> {
    let mut by_date: BTreeMap<NaiveDate, MergedRow> =
        existing.into_iter().map(|r| (r.date, r)).collect();
    for row in rows {
        by_date.insert(row.date, *row);
    }
    by_date.into_values().collect()
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<MergedRow>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols with at least one stored row.
    pub fn symbols(&self) -> Vec<String> {
        self.tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ScoreStore for MemoryStore {
    fn upsert(&self, symbol: &str, rows: &[MergedRow]) -> Result<(), DataError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DataError::StoreError("memory store lock poisoned".into()))?;
        let existing = tables.remove(symbol).unwrap_or_default();
        tables.insert(symbol.to_string(), merge_rows(existing, rows));
        Ok(())
    }

    fn load(&self, symbol: &str) -> Result<Vec<MergedRow>, DataError> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| DataError::StoreError("memory store lock poisoned".into()))?;
        Ok(tables.get(symbol).cloned().unwrap_or_default())
    }
}

/// Parquet-backed store: `{dir}/symbol={SYMBOL}/scores.parquet`.
///
/// Columns: `date`, then per metric `{metric}_z` (null when undefined) and
/// `{metric}_source` (date of the originating observation, null when undefined).
pub struct ParquetScoreStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles across threads.
    write_lock: Mutex<()>,
}

impl ParquetScoreStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("symbol={symbol}")).join("scores.parquet")
    }
}

impl ScoreStore for ParquetScoreStore {
    fn upsert(&self, symbol: &str, rows: &[MergedRow]) -> Result<(), DataError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| DataError::StoreError("score store lock poisoned".into()))?;

        let merged = merge_rows(self.load(symbol)?, rows);
        let path = self.table_path(symbol);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DataError::StoreError(format!("failed to create dir: {e}")))?;
        }

        let df = rows_to_dataframe(&merged)?;
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::StoreError(format!("atomic rename failed: {e}"))
        })?;

        tracing::debug!(symbol, rows = merged.len(), "stored score table");
        Ok(())
    }

    fn load(&self, symbol: &str) -> Result<Vec<MergedRow>, DataError> {
        let path = self.table_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        dataframe_to_rows(&read_parquet(&path)?)
    }
}

fn z_column(metric: Metric) -> String {
    metric.score_column().to_string()
}

fn source_column(metric: Metric) -> String {
    format!("{metric}_source")
}

fn rows_to_dataframe(rows: &[MergedRow]) -> Result<DataFrame, DataError> {
    let cast_err = |e: PolarsError| DataError::ParquetError(format!("date cast: {e}"));

    let dates: Vec<i32> = rows.iter().map(|r| date_to_epoch_days(r.date)).collect();
    let mut columns = vec![Column::new("date".into(), dates)
        .cast(&DataType::Date)
        .map_err(cast_err)?];

    for metric in Metric::ALL {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.cell(metric).value()).collect();
        let sources: Vec<Option<i32>> = rows
            .iter()
            .map(|r| r.cell(metric).source_date(r.date).map(date_to_epoch_days))
            .collect();
        columns.push(Column::new(z_column(metric).into(), values));
        columns.push(
            Column::new(source_column(metric).into(), sources)
                .cast(&DataType::Date)
                .map_err(cast_err)?,
        );
    }

    DataFrame::new(columns).map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<MergedRow>, DataError> {
    let col_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df.column("date").map_err(col_err)?.date().map_err(col_err)?;
    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let date = date_ca
            .get(i)
            .and_then(epoch_days_to_date)
            .ok_or_else(|| DataError::ParquetError(format!("null or invalid date at row {i}")))?;
        rows.push(MergedRow::empty(date));
    }

    for metric in Metric::ALL {
        let z_ca = df.column(&z_column(metric)).map_err(col_err)?.f64().map_err(col_err)?;
        let src_ca = df
            .column(&source_column(metric))
            .map_err(col_err)?
            .date()
            .map_err(col_err)?;

        for (i, row) in rows.iter_mut().enumerate() {
            let value = z_ca.get(i);
            let source = src_ca.get(i).and_then(epoch_days_to_date);
            *row.cell_mut(metric) = match (value, source) {
                (Some(value), Some(source)) if source == row.date => Cell::Observed { value },
                (Some(value), Some(source)) => Cell::Filled { value, source },
                (Some(value), None) => Cell::Observed { value },
                (None, _) => Cell::Undefined,
            };
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table(start: NaiveDate, n: u64, z: f64) -> Vec<MergedRow> {
        (0..n)
            .map(|i| {
                let date = start + Days::new(i);
                let mut row = MergedRow::empty(date);
                row.price = Cell::Observed { value: z };
                row.holdings = Cell::Filled {
                    value: -z,
                    source: start - Days::new(1),
                };
                row
            })
            .collect()
    }

    fn exercise_upsert(store: &dyn ScoreStore) {
        store.upsert("SPY", &table(d(2024, 1, 1), 5, 1.0)).unwrap();
        store.upsert("SPY", &table(d(2024, 1, 4), 4, 2.0)).unwrap();

        let rows = store.load("SPY").unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[2].price.value(), Some(1.0));
        // overlapping dates replaced by the later write
        assert_eq!(rows[3].price.value(), Some(2.0));
        assert_eq!(rows[6].date, d(2024, 1, 7));
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));

        let again = table(d(2024, 1, 4), 4, 2.0);
        store.upsert("SPY", &again).unwrap();
        assert_eq!(store.load("SPY").unwrap(), rows);
        assert!(store.load("QQQ").unwrap().is_empty());
    }

    #[test]
    fn memory_store_upserts() {
        let store = MemoryStore::new();
        exercise_upsert(&store);
        assert_eq!(store.symbols(), vec!["SPY".to_string()]);
    }

    #[test]
    fn parquet_store_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetScoreStore::new(dir.path());
        exercise_upsert(&store);
        assert!(dir.path().join("symbol=SPY").join("scores.parquet").exists());
    }

    #[test]
    fn parquet_store_preserves_cell_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetScoreStore::new(dir.path());
        let rows = table(d(2024, 3, 1), 3, 0.5);
        store.upsert("IWM", &rows).unwrap();
        let loaded = store.load("IWM").unwrap();
        assert_eq!(loaded, rows);
        assert!(loaded[0].search.is_undefined());
        assert_eq!(
            loaded[1].holdings,
            Cell::Filled {
                value: -0.5,
                source: d(2024, 2, 29)
            }
        );
        assert_eq!(loaded[2].price, Cell::Observed { value: 0.5 });
    }
}
