//! Outlier conditioner: global winsorization of a raw series.
//!
//! Bounds are the lower/upper percentiles of the *whole* series, computed once
//! before any rolling window sees the data. Short series pass through untouched.

use super::stats;
use crate::config::ConfigError;
use crate::domain::RawObservation;
use serde::{Deserialize, Serialize};

/// Percentile bounds a series was clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

/// Result of conditioning one series.
#[derive(Debug, Clone)]
pub struct Conditioned {
    /// Same length and dates as the input.
    pub observations: Vec<RawObservation>,
    /// `None` when the series was too short to condition.
    pub bounds: Option<Bounds>,
    /// Number of values that were replaced by a bound.
    pub clamped: usize,
}

#[derive(Debug, Clone)]
pub struct OutlierConditioner {
    lower_pct: f64,
    upper_pct: f64,
    min_points: usize,
}

impl OutlierConditioner {
    /// Percentiles are fractions: `0 <= lower_pct < upper_pct <= 1`.
    pub fn new(lower_pct: f64, upper_pct: f64, min_points: usize) -> Result<Self, ConfigError> {
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(lower_pct) || !in_unit(upper_pct) || lower_pct >= upper_pct {
            return Err(ConfigError::InvalidPercentiles {
                lower: lower_pct,
                upper: upper_pct,
            });
        }
        Ok(Self {
            lower_pct,
            upper_pct,
            min_points,
        })
    }

    /// Percentile bounds of the finite values, or `None` if there are too few.
    pub fn bounds(&self, observations: &[RawObservation]) -> Option<Bounds> {
        let mut finite: Vec<f64> = observations
            .iter()
            .filter(|o| !o.is_missing())
            .map(|o| o.value)
            .collect();
        if finite.is_empty() || finite.len() < self.min_points {
            return None;
        }
        finite.sort_by(f64::total_cmp);
        Some(Bounds {
            lower: stats::quantile_of_sorted(&finite, self.lower_pct),
            upper: stats::quantile_of_sorted(&finite, self.upper_pct),
        })
    }

    pub fn condition(&self, observations: &[RawObservation]) -> Conditioned {
        let Some(bounds) = self.bounds(observations) else {
            return Conditioned {
                observations: observations.to_vec(),
                bounds: None,
                clamped: 0,
            };
        };

        let mut clamped = 0;
        let conditioned = observations
            .iter()
            .map(|obs| {
                if obs.is_missing() {
                    return *obs;
                }
                let value = if obs.value < bounds.lower {
                    bounds.lower
                } else if obs.value > bounds.upper {
                    bounds.upper
                } else {
                    return *obs;
                };
                clamped += 1;
                RawObservation::new(obs.date, value)
            })
            .collect();

        Conditioned {
            observations: conditioned,
            bounds: Some(bounds),
            clamped,
        }
    }
}
