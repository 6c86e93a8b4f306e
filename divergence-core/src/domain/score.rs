//! Standardized scores and the explicit "undefined" marker.

use super::metric::Metric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a score could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The observation being scored is itself missing.
    Missing,
    /// The trailing window holds fewer valid observations than required.
    InsufficientData,
    /// The trailing window has zero standard deviation / MAD.
    ZeroDispersion,
}

/// A standardized score.
///
/// `Undefined` is a first-class value, not an error and never a zero:
/// consumers must decide whether to skip it or render it as a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Defined(v) => Some(*v),
            Score::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Score::Defined(_))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Defined(v) => write!(f, "{v:.3}"),
            Score::Undefined(_) => f.write_str("undefined"),
        }
    }
}

/// One standardized value on a metric's native timeline.
///
/// `date` always equals the timestamp of the raw observation it was computed
/// from; standardization never creates new timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardizedPoint {
    pub date: NaiveDate,
    pub metric: Metric,
    pub score: Score,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_has_no_value() {
        let s = Score::Undefined(UndefinedReason::ZeroDispersion);
        assert_eq!(s.value(), None);
        assert!(!s.is_defined());
        assert_ne!(s, Score::Defined(0.0));
    }

    #[test]
    fn serializes_with_explicit_kind() {
        let json = serde_json::to_string(&Score::Undefined(UndefinedReason::Missing)).unwrap();
        assert_eq!(json, r#"{"kind":"undefined","value":"missing"}"#);
        let json = serde_json::to_string(&Score::Defined(1.5)).unwrap();
        assert_eq!(json, r#"{"kind":"defined","value":1.5}"#);
    }
}
