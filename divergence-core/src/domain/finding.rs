//! Advisory quality findings.

use super::metric::Metric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    /// A standardized score beyond the extreme-magnitude threshold.
    ExtremeScore,
    /// A metric column that is mostly undefined.
    Completeness,
    /// A raw value outside its metric's plausible range.
    InvalidValue,
    /// No raw observations at all for a metric.
    MissingData,
    /// Missing business days inside a daily series.
    DataGaps,
    /// Raw input was unsorted or carried duplicate dates and had to be reordered.
    Canonicalized,
    /// Raw prices outside the interquartile fences.
    Outliers,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingCategory::ExtremeScore => "EXTREME_SCORE",
            FindingCategory::Completeness => "COMPLETENESS",
            FindingCategory::InvalidValue => "INVALID_VALUE",
            FindingCategory::MissingData => "MISSING_DATA",
            FindingCategory::DataGaps => "DATA_GAPS",
            FindingCategory::Canonicalized => "CANONICALIZED",
            FindingCategory::Outliers => "OUTLIERS",
        };
        f.pad(s)
    }
}

/// A suspicious pattern in the input or output. Never blocks a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFinding {
    pub severity: Severity,
    pub category: FindingCategory,
    pub date: Option<NaiveDate>,
    pub metric: Option<Metric>,
    pub message: String,
}

impl QualityFinding {
    pub fn new(severity: Severity, category: FindingCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            date: None,
            metric: None,
            message: message.into(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

impl fmt::Display for QualityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.category)?;
        if let Some(metric) = self.metric {
            write!(f, " {metric}")?;
        }
        if let Some(date) = self.date {
            write!(f, " @ {date}")?;
        }
        write!(f, ": {}", self.message)
    }
}
