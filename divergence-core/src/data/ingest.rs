//! CSV import of raw series.
//!
//! Expected format: a header row and `date,value` columns, dates as
//! `YYYY-MM-DD`. An empty value is a missing observation. A value that does not
//! parse as a finite number (including `NaN` and `inf`) rejects the file with
//! its line number.

use super::provider::DataError;
use crate::domain::RawObservation;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    value: Option<f64>,
}

/// Parse `date,value` CSV from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawObservation>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let invalid = |line: u64, message: String| DataError::InvalidCsv { line, message };
    let headers = rdr
        .headers()
        .map_err(|e| invalid(e.position().map(|p| p.line()).unwrap_or(1), e.to_string()))?
        .clone();

    let mut observations = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        let more = rdr
            .read_record(&mut record)
            .map_err(|e| invalid(e.position().map(|p| p.line()).unwrap_or(0), e.to_string()))?;
        if !more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| invalid(line, e.to_string()))?;
        let value = match row.value {
            Some(v) if !v.is_finite() => {
                return Err(invalid(line, format!("non-finite value {v}")));
            }
            Some(v) => v,
            None => f64::NAN,
        };
        observations.push(RawObservation::new(row.date, value));
    }
    Ok(observations)
}

/// Parse a `date,value` CSV file.
pub fn import_csv(path: &Path) -> Result<Vec<RawObservation>, DataError> {
    let file = File::open(path)
        .map_err(|e| DataError::Other(format!("open {}: {e}", path.display())))?;
    read_csv(file)
}
