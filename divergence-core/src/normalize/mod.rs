//! The normalization pipeline.
//!
//! Per symbol: load three raw series, canonicalize, winsorize, classify,
//! standardize on each native timeline, merge onto a daily timeline, audit.
//! Every stage is a pure function of its input and the configuration, so
//! running twice over unchanged input yields identical rows.

pub mod auditor;
pub mod canonicalize;
pub mod classifier;
pub mod conditioner;
pub mod merger;
pub mod standardizer;
pub mod stats;
pub mod validate;

pub use auditor::QualityAuditor;
pub use canonicalize::canonicalize;
pub use classifier::{Classification, DistributionClassifier};
pub use conditioner::{Bounds, Conditioned, OutlierConditioner};
pub use merger::CrossFrequencyMerger;
pub use standardizer::{Formula, RollingStandardizer, MAD_CONSISTENCY};
pub use validate::{validate_series, validate_set};

use crate::config::{ConfigError, NormalizationConfig};
use crate::data::{DataError, SeriesLoader};
use crate::domain::{
    DatasetHash, MergedRow, Metric, QualityFinding, RawObservation, SeriesSet, StandardizedPoint,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no usable data for symbol '{symbol}'")]
    DataUnavailable { symbol: String },

    #[error("failed to load {metric} for '{symbol}': {source}")]
    Load {
        symbol: String,
        metric: Metric,
        #[source]
        source: DataError,
    },
}

/// What the pipeline decided for one metric's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub metric: Metric,
    /// Observations after canonicalization.
    pub observations: usize,
    /// Finite observations.
    pub usable: usize,
    /// Winsorization bounds, `None` when the series was too short.
    pub bounds: Option<Bounds>,
    pub clamped: usize,
    pub formula: Formula,
    pub skewness: Option<f64>,
    /// Points with a defined score on the native timeline.
    pub defined: usize,
}

/// Result of normalizing one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationOutput {
    pub symbol: String,
    pub rows: Vec<MergedRow>,
    pub findings: Vec<QualityFinding>,
    pub series: Vec<SeriesReport>,
    /// Content hash of the canonical raw input.
    pub dataset_hash: DatasetHash,
}

/// Load all three raw series of a symbol, in metric order.
pub fn load_series(symbol: &str, loader: &dyn SeriesLoader) -> Result<SeriesSet, NormalizeError> {
    let mut set = SeriesSet::default();
    for metric in Metric::ALL {
        *set.get_mut(metric) = loader
            .load_raw(symbol, metric)
            .map_err(|source| NormalizeError::Load {
                symbol: symbol.to_string(),
                metric,
                source,
            })?;
    }
    Ok(set)
}

pub struct Normalizer {
    config: NormalizationConfig,
    conditioner: OutlierConditioner,
    classifier: DistributionClassifier,
    merger: CrossFrequencyMerger,
    auditor: QualityAuditor,
}

impl Normalizer {
    /// Build a pipeline from a validated configuration.
    pub fn new(config: NormalizationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            conditioner: OutlierConditioner::new(
                config.winsor_lower,
                config.winsor_upper,
                config.min_condition_points,
            )?,
            classifier: DistributionClassifier::new(config.skew_threshold, config.min_skew_points),
            merger: CrossFrequencyMerger::new(&config),
            auditor: QualityAuditor::new(config.extreme_score, config.max_undefined_share),
            config,
        })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Normalize one symbol from a loader.
    pub fn normalize(
        &self,
        symbol: &str,
        loader: &dyn SeriesLoader,
    ) -> Result<NormalizationOutput, NormalizeError> {
        let raw = load_series(symbol, loader)?;
        self.normalize_series(symbol, raw)
    }

    /// Normalize one symbol from already loaded raw series.
    pub fn normalize_series(
        &self,
        symbol: &str,
        raw: SeriesSet,
    ) -> Result<NormalizationOutput, NormalizeError> {
        let mut findings = Vec::new();
        let mut canonical = SeriesSet::default();
        let SeriesSet {
            price,
            holdings,
            search,
        } = raw;
        for (metric, observations) in [
            (Metric::Price, price),
            (Metric::Holdings, holdings),
            (Metric::Search, search),
        ] {
            let (observations, finding) = canonicalize(metric, observations);
            findings.extend(finding);
            *canonical.get_mut(metric) = observations;
        }

        if canonical.is_unusable() {
            return Err(NormalizeError::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }

        let mut points: Vec<Vec<StandardizedPoint>> = Vec::with_capacity(3);
        let mut series = Vec::with_capacity(3);
        for metric in Metric::ALL {
            let (scored, report) = self.standardize_series(symbol, metric, canonical.get(metric));
            points.push(scored);
            series.push(report);
        }

        let rows = self.merger.merge(&points[0], &points[1], &points[2]);
        findings.extend(self.auditor.audit(&rows));

        tracing::debug!(
            symbol,
            rows = rows.len(),
            findings = findings.len(),
            "normalized symbol"
        );

        Ok(NormalizationOutput {
            symbol: symbol.to_string(),
            rows,
            findings,
            series,
            dataset_hash: canonical.content_hash(),
        })
    }

    /// Condition, classify and standardize one canonical series.
    pub fn standardize_series(
        &self,
        symbol: &str,
        metric: Metric,
        observations: &[RawObservation],
    ) -> (Vec<StandardizedPoint>, SeriesReport) {
        let conditioned = self.conditioner.condition(observations);
        let Classification { formula, skewness } = self.classifier.classify(&conditioned.observations);
        let standardizer = RollingStandardizer::from_valid_spec(metric, self.config.spec(metric), formula);
        let points = standardizer.compute(&conditioned.observations);

        let report = SeriesReport {
            metric,
            observations: observations.len(),
            usable: observations.iter().filter(|o| !o.is_missing()).count(),
            bounds: conditioned.bounds,
            clamped: conditioned.clamped,
            formula,
            skewness,
            defined: points.iter().filter(|p| p.score.is_defined()).count(),
        };

        tracing::debug!(
            symbol,
            %metric,
            %formula,
            skewness = ?skewness,
            clamped = conditioned.clamped,
            defined = report.defined,
            "standardized series"
        );

        (points, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryLoader;
    use crate::domain::{FindingCategory, Score};
    use chrono::{Days, NaiveDate};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizationConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = NormalizationConfig::default();
        config.search.window = 2;
        assert!(Normalizer::new(config).is_err());
    }

    #[test]
    fn empty_loader_is_data_unavailable() {
        let err = normalizer().normalize("NONE", &MemoryLoader::new()).unwrap_err();
        assert!(matches!(err, NormalizeError::DataUnavailable { ref symbol } if symbol == "NONE"));
    }

    #[test]
    fn all_missing_values_are_data_unavailable() {
        let loader = MemoryLoader::new().with(
            "NAN",
            Metric::Price,
            vec![RawObservation::new(d(2024, 1, 2), f64::NAN)],
        );
        assert!(matches!(
            normalizer().normalize("NAN", &loader),
            Err(NormalizeError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn single_metric_still_produces_rows() {
        let search: Vec<RawObservation> = (0..10)
            .map(|i| RawObservation::new(d(2024, 1, 7) + Days::new(7 * i), 20.0 + (i % 3) as f64))
            .collect();
        let loader = MemoryLoader::new().with("SRCH", Metric::Search, search);
        let out = normalizer().normalize("SRCH", &loader).unwrap();

        assert_eq!(out.rows.len(), 64);
        assert!(out.rows.iter().all(|r| r.price.is_undefined() && r.holdings.is_undefined()));
        assert!(out.rows.iter().any(|r| !r.search.is_undefined()));
        assert_eq!(out.series.len(), 3);
        assert_eq!(out.series[2].observations, 10);
        // price and holdings columns are fully undefined
        assert_eq!(
            out.findings
                .iter()
                .filter(|f| f.category == FindingCategory::Completeness)
                .count(),
            2
        );
    }

    #[test]
    fn unsorted_input_is_canonicalized_with_warning() {
        let search = vec![
            RawObservation::new(d(2024, 1, 21), 3.0),
            RawObservation::new(d(2024, 1, 7), 1.0),
            RawObservation::new(d(2024, 1, 14), 2.0),
            RawObservation::new(d(2024, 1, 14), 9.0),
        ];
        let out = normalizer()
            .normalize_series(
                "UNS",
                SeriesSet {
                    search,
                    ..Default::default()
                },
            )
            .unwrap();
        let canon: Vec<_> = out
            .findings
            .iter()
            .filter(|f| f.category == FindingCategory::Canonicalized)
            .collect();
        assert_eq!(canon.len(), 1);
        assert_eq!(canon[0].metric, Some(Metric::Search));
        assert_eq!(out.series[2].observations, 3);
        assert_eq!(out.rows.first().unwrap().date, d(2024, 1, 7));
    }

    #[test]
    fn hash_ignores_input_order() {
        let a = vec![
            RawObservation::new(d(2024, 1, 7), 1.0),
            RawObservation::new(d(2024, 1, 14), 2.0),
        ];
        let mut b = a.clone();
        b.reverse();
        let n = normalizer();
        let ha = n
            .normalize_series("H", SeriesSet { search: a, ..Default::default() })
            .unwrap()
            .dataset_hash;
        let hb = n
            .normalize_series("H", SeriesSet { search: b, ..Default::default() })
            .unwrap()
            .dataset_hash;
        assert_eq!(ha, hb);
    }

    #[test]
    fn report_records_formula_choice() {
        let mut values = vec![1.0; 30];
        values.extend([5.0, 12.0, 40.0]);
        let obs: Vec<RawObservation> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawObservation::new(d(2024, 1, 1) + Days::new(i as u64), v))
            .collect();
        let (points, report) = normalizer().standardize_series("SKEW", Metric::Price, &obs);
        assert_eq!(points.len(), obs.len());
        assert_eq!(report.formula, Formula::Robust);
        assert!(report.skewness.unwrap() > 1.5);
        assert!(report.bounds.is_some());
        // Flat history has zero MAD: nothing is defined until the window spreads.
        assert_eq!(points[20].score, Score::Undefined(crate::domain::UndefinedReason::ZeroDispersion));
    }
}
