//! The merged daily table: one row per calendar day, one cell per metric.

use super::metric::Metric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single metric's value on a single day of the merged table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    /// A score computed for an observation on exactly this date.
    Observed { value: f64 },
    /// A copy of an earlier score, carried forward within the metric's max gap.
    Filled { value: f64, source: NaiveDate },
    Undefined,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Observed { value } | Cell::Filled { value, .. } => Some(*value),
            Cell::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Cell::Undefined)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled { .. })
    }

    /// Date of the observation the value originates from.
    pub fn source_date(&self, row_date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Cell::Observed { .. } => Some(row_date),
            Cell::Filled { source, .. } => Some(*source),
            Cell::Undefined => None,
        }
    }
}

/// One calendar day of the normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub date: NaiveDate,
    pub price: Cell,
    pub holdings: Cell,
    pub search: Cell,
}

impl MergedRow {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            price: Cell::Undefined,
            holdings: Cell::Undefined,
            search: Cell::Undefined,
        }
    }

    pub fn cell(&self, metric: Metric) -> Cell {
        match metric {
            Metric::Price => self.price,
            Metric::Holdings => self.holdings,
            Metric::Search => self.search,
        }
    }

    pub fn cell_mut(&mut self, metric: Metric) -> &mut Cell {
        match metric {
            Metric::Price => &mut self.price,
            Metric::Holdings => &mut self.holdings,
            Metric::Search => &mut self.search,
        }
    }
}
