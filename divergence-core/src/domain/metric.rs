//! The three tracked metrics and their native update cadences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A tracked metric. Each symbol carries one raw series per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Daily closing price.
    Price,
    /// Quarterly institutional ownership percent (13F filings).
    Holdings,
    /// Weekly search interest (0-100 scale).
    Search,
}

impl Metric {
    /// All metrics, in merged-table column order.
    pub const ALL: [Metric; 3] = [Metric::Price, Metric::Holdings, Metric::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Price => "price",
            Metric::Holdings => "holdings",
            Metric::Search => "search",
        }
    }

    /// The cadence at which the upstream source publishes this metric.
    pub fn native_cadence(&self) -> Cadence {
        match self {
            Metric::Price => Cadence::Daily,
            Metric::Holdings => Cadence::Quarterly,
            Metric::Search => Cadence::Weekly,
        }
    }

    /// Column name used for the standardized score in exported tables.
    pub fn score_column(&self) -> &'static str {
        match self {
            Metric::Price => "price_z",
            Metric::Holdings => "holdings_z",
            Metric::Search => "search_z",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric '{0}' (expected price, holdings or search)")]
pub struct ParseMetricError(pub String);

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" | "prices" => Ok(Metric::Price),
            "holdings" | "institutional" => Ok(Metric::Holdings),
            "search" | "trends" | "retail_search" => Ok(Metric::Search),
            other => Err(ParseMetricError(other.to_string())),
        }
    }
}

/// Native update frequency of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Weekly,
    Quarterly,
}

impl Cadence {
    /// Nominal number of calendar days between two updates.
    pub fn nominal_days(&self) -> i64 {
        match self {
            Cadence::Daily => 1,
            Cadence::Weekly => 7,
            Cadence::Quarterly => 91,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Quarterly => "quarterly",
        };
        f.pad(s)
    }
}
