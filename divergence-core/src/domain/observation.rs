//! Raw observations as delivered by a series loader.

use super::metric::Metric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A timestamped scalar for one (symbol, metric) pair at the metric's native cadence.
///
/// A non-finite `value` is a missing observation: it keeps its slot on the
/// native timeline but never contributes to any statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub value: f64,
}

impl RawObservation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    /// Returns true if the value cannot take part in a statistic.
    pub fn is_missing(&self) -> bool {
        !self.value.is_finite()
    }
}

/// The three raw series of a single symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSet {
    pub price: Vec<RawObservation>,
    pub holdings: Vec<RawObservation>,
    pub search: Vec<RawObservation>,
}

impl SeriesSet {
    pub fn get(&self, metric: Metric) -> &[RawObservation] {
        match metric {
            Metric::Price => &self.price,
            Metric::Holdings => &self.holdings,
            Metric::Search => &self.search,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut Vec<RawObservation> {
        match metric {
            Metric::Price => &mut self.price,
            Metric::Holdings => &mut self.holdings,
            Metric::Search => &mut self.search,
        }
    }

    /// Number of finite observations for a metric.
    pub fn usable(&self, metric: Metric) -> usize {
        self.get(metric).iter().filter(|o| !o.is_missing()).count()
    }

    /// True if no metric carries a single finite observation.
    pub fn is_unusable(&self) -> bool {
        Metric::ALL.iter().all(|m| self.usable(*m) == 0)
    }

    /// Content hash over all three series, in metric order.
    ///
    /// Two runs over the same input produce the same hash, which makes
    /// persisted score tables traceable back to the raw data they came from.
    pub fn content_hash(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for metric in Metric::ALL {
            hasher.update(metric.as_str().as_bytes());
            for obs in self.get(metric) {
                hasher.update(obs.date.to_string().as_bytes());
                hasher.update(&obs.value.to_le_bytes());
            }
        }
        DatasetHash(hasher.finalize().to_hex().to_string())
    }
}

/// Deterministic dataset hash (content hash of the raw series)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn nan_is_missing() {
        assert!(RawObservation::new(d(2024, 1, 2), f64::NAN).is_missing());
        assert!(RawObservation::new(d(2024, 1, 2), f64::INFINITY).is_missing());
        assert!(!RawObservation::new(d(2024, 1, 2), 0.0).is_missing());
    }

    #[test]
    fn unusable_when_only_missing_values() {
        let mut set = SeriesSet::default();
        assert!(set.is_unusable());
        set.search.push(RawObservation::new(d(2024, 1, 7), f64::NAN));
        assert!(set.is_unusable());
        set.holdings.push(RawObservation::new(d(2024, 3, 31), 61.2));
        assert!(!set.is_unusable());
        assert_eq!(set.usable(Metric::Holdings), 1);
    }

    #[test]
    fn content_hash_is_deterministic_and_sensitive() {
        let mut a = SeriesSet::default();
        a.price.push(RawObservation::new(d(2024, 1, 2), 100.0));
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        let mut c = a.clone();
        c.price[0].value = 100.5;
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
