//! Rolling standardizer: trailing-window scores on a metric's native timeline.
//!
//! For observation `i` the window is the last `window` observations ending at
//! `i` (by position, in native units). Observations after `i` are never read.
//!
//! Two formulas share the same window machinery:
//! - Classical: `(x - mean) / std` with the sample standard deviation.
//! - Robust: `(x - median) / (1.4826 * MAD)`.
//!
//! Undefined results, in priority order: the scored value is missing; fewer
//! than `min_periods` valid values in the window; zero dispersion.

use super::stats;
use crate::config::{ConfigError, SeriesSpec};
use crate::domain::{Metric, RawObservation, Score, StandardizedPoint, UndefinedReason};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scales MAD so that robust and classical scores agree under a normal distribution.
pub const MAD_CONSISTENCY: f64 = 1.4826;

/// Standardization strategy, chosen once per series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// Mean / sample standard deviation.
    Classical,
    /// Median / scaled median absolute deviation.
    Robust,
}

impl Formula {
    /// Center and scale of a window of finite values.
    ///
    /// `None` means the window cannot support this formula (too small for a
    /// sample standard deviation).
    fn center_and_scale(&self, window: &[f64]) -> Option<(f64, f64)> {
        match self {
            Formula::Classical => {
                let center = stats::mean(window)?;
                let scale = stats::sample_std(window)?;
                Some((center, scale))
            }
            Formula::Robust => {
                let (center, mad) = stats::median_abs_deviation(window)?;
                Some((center, MAD_CONSISTENCY * mad))
            }
        }
    }

    /// Score `x` against a window of finite values.
    pub fn score(&self, x: f64, window: &[f64], min_periods: usize) -> Score {
        if !x.is_finite() {
            return Score::Undefined(UndefinedReason::Missing);
        }
        if window.len() < min_periods.max(1) {
            return Score::Undefined(UndefinedReason::InsufficientData);
        }
        match self.center_and_scale(window) {
            None => Score::Undefined(UndefinedReason::InsufficientData),
            Some((_, scale)) if scale == 0.0 || !scale.is_finite() => {
                Score::Undefined(UndefinedReason::ZeroDispersion)
            }
            Some((center, scale)) => Score::Defined((x - center) / scale),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Classical => f.write_str("classical"),
            Formula::Robust => f.write_str("robust"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RollingStandardizer {
    metric: Metric,
    window: usize,
    min_periods: usize,
    formula: Formula,
}

impl RollingStandardizer {
    pub fn new(metric: Metric, spec: &SeriesSpec, formula: Formula) -> Result<Self, ConfigError> {
        spec.validate(metric)?;
        Ok(Self::from_valid_spec(metric, spec, formula))
    }

    /// `spec` must already have passed [`SeriesSpec::validate`].
    pub(crate) fn from_valid_spec(metric: Metric, spec: &SeriesSpec, formula: Formula) -> Self {
        Self {
            metric,
            window: spec.window,
            min_periods: spec.min_periods,
            formula,
        }
    }

    pub fn formula(&self) -> Formula {
        self.formula
    }

    /// One point per observation, dated exactly as the observation.
    pub fn compute(&self, observations: &[RawObservation]) -> Vec<StandardizedPoint> {
        let mut window_values: Vec<f64> = Vec::with_capacity(self.window);

        observations
            .iter()
            .enumerate()
            .map(|(i, obs)| {
                let start = (i + 1).saturating_sub(self.window);
                window_values.clear();
                window_values.extend(
                    observations[start..=i]
                        .iter()
                        .filter(|o| !o.is_missing())
                        .map(|o| o.value),
                );
                StandardizedPoint {
                    date: obs.date,
                    metric: self.metric,
                    score: self.formula.score(obs.value, &window_values, self.min_periods),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizationConfig;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn daily(values: &[f64]) -> Vec<RawObservation> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawObservation::new(base + chrono::Duration::days(i as i64), v))
            .collect()
    }

    fn price_standardizer(formula: Formula) -> RollingStandardizer {
        RollingStandardizer::new(Metric::Price, &NormalizationConfig::default().price, formula).unwrap()
    }

    #[test]
    fn flat_price_is_undefined_everywhere() {
        let obs = daily(&[100.0; 40]);
        for formula in [Formula::Classical, Formula::Robust] {
            let points = price_standardizer(formula).compute(&obs);
            assert_eq!(points.len(), 40);
            for (i, p) in points.iter().enumerate() {
                assert!(!p.score.is_defined(), "day {i} must be undefined");
                assert_ne!(p.score, Score::Defined(0.0));
            }
            // Past the warm-up the reason is the flat window, not a lack of data.
            assert_eq!(points[20].score, Score::Undefined(UndefinedReason::ZeroDispersion));
            assert_eq!(points[5].score, Score::Undefined(UndefinedReason::InsufficientData));
        }
    }

    #[test]
    fn five_points_below_price_minimum_are_undefined() {
        let obs = daily(&[10.0, 11.0, 9.0, 12.0, 10.5]);
        let points = price_standardizer(Formula::Classical).compute(&obs);
        assert_eq!(points.len(), 5);
        assert!(points
            .iter()
            .all(|p| p.score == Score::Undefined(UndefinedReason::InsufficientData)));
    }

    #[test]
    fn dates_match_input_timestamps() {
        let obs = daily(&(0..50).map(|i| (i as f64).sin() * 3.0 + 50.0).collect::<Vec<_>>());
        let points = price_standardizer(Formula::Classical).compute(&obs);
        for (o, p) in obs.iter().zip(&points) {
            assert_eq!(o.date, p.date);
            assert_eq!(p.metric, Metric::Price);
        }
    }

    #[test]
    fn classical_matches_hand_computed_value() {
        let spec = SeriesSpec {
            cadence: crate::domain::Cadence::Weekly,
            window: 4,
            min_periods: 4,
            max_gap_days: 7,
        };
        let s = RollingStandardizer::new(Metric::Search, &spec, Formula::Classical).unwrap();
        let points = s.compute(&daily(&[10.0, 20.0, 30.0, 40.0, 50.0]));
        assert!(!points[2].score.is_defined());
        // window [20,30,40,50]: mean 35, sample std sqrt(500/3)
        let expected = (50.0 - 35.0) / (500.0_f64 / 3.0).sqrt();
        assert!((points[4].score.value().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn invalid_window_is_an_error() {
        let spec = SeriesSpec {
            cadence: crate::domain::Cadence::Weekly,
            window: 3,
            min_periods: 4,
            max_gap_days: 7,
        };
        let result = RollingStandardizer::new(Metric::Search, &spec, Formula::Classical);
        assert!(matches!(result, Err(ConfigError::InvalidWindow { .. })));
    }

    #[test]
    fn robust_matches_hand_computed_value() {
        let spec = SeriesSpec {
            cadence: crate::domain::Cadence::Quarterly,
            window: 4,
            min_periods: 2,
            max_gap_days: 95,
        };
        let s = RollingStandardizer::new(Metric::Holdings, &spec, Formula::Robust).unwrap();
        let points = s.compute(&daily(&[1.0, 2.0, 4.0, 8.0]));
        // window [1,2,4,8]: median 3, |dev| [2,1,1,5] -> MAD 1.5
        let expected = (8.0 - 3.0) / (MAD_CONSISTENCY * 1.5);
        assert!((points[3].score.value().unwrap() - expected).abs() < 1e-12);
        // min_periods 2: first point undefined, second defined
        assert!(!points[0].score.is_defined());
        assert!(points[1].score.is_defined());
    }

    #[test]
    fn window_never_reads_future_observations() {
        let base: Vec<f64> = (0..60).map(|i| ((i * 7) % 13) as f64).collect();
        let mut altered = base.clone();
        for v in altered.iter_mut().skip(45) {
            *v *= 50.0;
        }
        let a = price_standardizer(Formula::Classical).compute(&daily(&base));
        let b = price_standardizer(Formula::Classical).compute(&daily(&altered));
        assert_eq!(a[..45], b[..45]);
    }

    #[test]
    fn missing_values_are_skipped_in_window_and_undefined_in_place() {
        let mut values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        values[15] = f64::NAN;
        let points = price_standardizer(Formula::Classical).compute(&daily(&values));
        assert_eq!(points[15].score, Score::Undefined(UndefinedReason::Missing));
        assert!(points[16].score.is_defined());
    }

    #[test]
    fn all_missing_window_is_undefined() {
        let points = price_standardizer(Formula::Robust).compute(&daily(&[f64::NAN; 20]));
        assert!(points.iter().all(|p| !p.score.is_defined()));
    }

    #[test]
    fn zero_mad_is_undefined_even_with_spread() {
        // Majority of the window equal to the median -> MAD 0
        let window = [5.0, 5.0, 5.0, 9.0];
        assert_eq!(
            Formula::Robust.score(9.0, &window, 2),
            Score::Undefined(UndefinedReason::ZeroDispersion)
        );
        assert!(Formula::Classical.score(9.0, &window, 2).is_defined());
    }

    #[test]
    fn formulas_agree_on_symmetric_input() {
        // Approximately normal sample (Irwin-Hall sum of 12 uniforms), centred on 0.
        let mut rng = StdRng::seed_from_u64(7);
        let window: Vec<f64> = (0..20_000)
            .map(|_| (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0)
            .collect();
        assert!(stats::skewness(&window).unwrap().abs() < 0.1);

        for x in [-2.0, -1.0, 0.0, 0.5, 1.0, 2.0] {
            let classical = Formula::Classical.score(x, &window, 1).value().unwrap();
            let robust = Formula::Robust.score(x, &window, 1).value().unwrap();
            assert!(
                (classical - robust).abs() < 0.1,
                "x={x}: classical={classical}, robust={robust}"
            );
        }
    }
}
