//! Normalization configuration: per-metric windowing table and thresholds.
//!
//! Windows are expressed in each metric's *native* units (days for price,
//! weeks for search, quarters for holdings), never in wall-clock days. The
//! only calendar-day quantity is the forward-fill gap used by the merger.

use crate::domain::{Cadence, Metric};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Windowing and fill policy for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub cadence: Cadence,
    /// Trailing window length, in native observations.
    pub window: usize,
    /// Minimum valid observations in the window before a score is produced.
    pub min_periods: usize,
    /// Maximum calendar-day distance a score may be carried forward.
    pub max_gap_days: i64,
}

impl SeriesSpec {
    pub fn validate(&self, metric: Metric) -> Result<(), ConfigError> {
        if self.min_periods < 1 || self.window < self.min_periods {
            return Err(ConfigError::InvalidWindow {
                metric,
                window: self.window,
                min_periods: self.min_periods,
            });
        }
        if self.max_gap_days < 0 {
            return Err(ConfigError::NegativeGap {
                metric,
                max_gap_days: self.max_gap_days,
            });
        }
        Ok(())
    }
}

/// Which days the merged table covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    /// Every calendar day between the earliest and latest observation of any metric.
    #[default]
    Calendar,
    /// Only the dates carrying a price observation (trading days).
    PriceDates,
}

/// Full configuration of a normalization run. Immutable for the life of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub price: SeriesSpec,
    pub holdings: SeriesSpec,
    pub search: SeriesSpec,

    /// Lower winsorization percentile, as a fraction (0.01 = 1st percentile).
    pub winsor_lower: f64,
    /// Upper winsorization percentile, as a fraction.
    pub winsor_upper: f64,
    /// Series with fewer finite points than this are not winsorized.
    pub min_condition_points: usize,

    /// |skew| above this routes a series to the median/MAD formula.
    pub skew_threshold: f64,
    /// Series with fewer finite points than this always use mean/std.
    pub min_skew_points: usize,

    /// |score| above this is reported as an extreme value.
    pub extreme_score: f64,
    /// Undefined share of a column above this is reported as incomplete.
    pub max_undefined_share: f64,

    pub timeline: Timeline,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            price: SeriesSpec {
                cadence: Cadence::Daily,
                window: 30,
                min_periods: 14,
                max_gap_days: 3,
            },
            holdings: SeriesSpec {
                cadence: Cadence::Quarterly,
                window: 4,
                min_periods: 2,
                max_gap_days: 95,
            },
            search: SeriesSpec {
                cadence: Cadence::Weekly,
                window: 4,
                min_periods: 4,
                max_gap_days: 7,
            },
            winsor_lower: 0.01,
            winsor_upper: 0.99,
            min_condition_points: 10,
            skew_threshold: 1.5,
            min_skew_points: 10,
            extreme_score: 5.0,
            max_undefined_share: 0.5,
            timeline: Timeline::Calendar,
        }
    }
}

impl NormalizationConfig {
    pub fn spec(&self, metric: Metric) -> &SeriesSpec {
        match metric {
            Metric::Price => &self.price,
            Metric::Holdings => &self.holdings,
            Metric::Search => &self.search,
        }
    }

    /// Check every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for metric in Metric::ALL {
            self.spec(metric).validate(metric)?;
        }
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(self.winsor_lower) || !in_unit(self.winsor_upper) || self.winsor_lower >= self.winsor_upper {
            return Err(ConfigError::InvalidPercentiles {
                lower: self.winsor_lower,
                upper: self.winsor_upper,
            });
        }
        if !(self.skew_threshold.is_finite() && self.skew_threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "skew_threshold",
                value: self.skew_threshold,
            });
        }
        if !(self.extreme_score.is_finite() && self.extreme_score > 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "extreme_score",
                value: self.extreme_score,
            });
        }
        if !in_unit(self.max_undefined_share) {
            return Err(ConfigError::InvalidThreshold {
                name: "max_undefined_share",
                value: self.max_undefined_share,
            });
        }
        Ok(())
    }

    /// Parse from TOML and validate. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{metric}: window ({window}) must be >= min_periods ({min_periods}) >= 1")]
    InvalidWindow {
        metric: Metric,
        window: usize,
        min_periods: usize,
    },

    #[error("{metric}: max_gap_days must be non-negative, got {max_gap_days}")]
    NegativeGap { metric: Metric, max_gap_days: i64 },

    #[error("winsorization percentiles must satisfy 0 <= lower < upper <= 1, got {lower}/{upper}")]
    InvalidPercentiles { lower: f64, upper: f64 },

    #[error("invalid {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config read error: {0}")]
    Io(String),
}
