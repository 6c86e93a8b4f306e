//! Distribution classifier: picks the standardization formula for a series.
//!
//! The decision is made once per series from the skewness of the conditioned
//! values, so one output series never switches formula mid-way.

use super::standardizer::Formula;
use super::stats;
use crate::domain::RawObservation;

#[derive(Debug, Clone)]
pub struct DistributionClassifier {
    skew_threshold: f64,
    min_points: usize,
}

/// Outcome of classifying one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub formula: Formula,
    /// `None` when the series was too short to estimate skewness.
    pub skewness: Option<f64>,
}

impl DistributionClassifier {
    pub fn new(skew_threshold: f64, min_points: usize) -> Self {
        Self {
            skew_threshold,
            min_points,
        }
    }

    pub fn classify(&self, observations: &[RawObservation]) -> Classification {
        let finite: Vec<f64> = observations
            .iter()
            .filter(|o| !o.is_missing())
            .map(|o| o.value)
            .collect();

        if finite.len() < self.min_points.max(3) {
            return Classification {
                formula: Formula::Classical,
                skewness: None,
            };
        }

        let skewness = stats::skewness(&finite);
        let formula = match skewness {
            Some(s) if s.abs() > self.skew_threshold => Formula::Robust,
            _ => Formula::Classical,
        };
        Classification { formula, skewness }
    }
}
