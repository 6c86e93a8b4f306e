//! Raw series validation: plausibility checks run before normalization.
//!
//! Findings are advisory. An implausible value still flows through the
//! pipeline, where winsorization limits its influence.

use super::canonicalize::canonicalize;
use super::stats;
use crate::domain::{FindingCategory, Metric, QualityFinding, RawObservation, SeriesSet, Severity};
use chrono::{Datelike, Days, Weekday};

/// Plausible range of raw values for a metric (inclusive unless noted).
fn in_range(metric: Metric, value: f64) -> bool {
    match metric {
        // Prices must be strictly positive.
        Metric::Price => value > 0.0,
        // Ownership percent and search interest index.
        Metric::Holdings | Metric::Search => (0.0..=100.0).contains(&value),
    }
}

/// Tukey fence multiplier for the price outlier count.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Price outlier checks need more than this many finite values.
const MIN_IQR_POINTS: usize = 10;

fn range_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Price => "> 0",
        Metric::Holdings | Metric::Search => "in [0, 100]",
    }
}

/// Validate one canonical (ascending, duplicate-free) raw series.
pub fn validate_series(metric: Metric, observations: &[RawObservation]) -> Vec<QualityFinding> {
    if observations.is_empty() {
        return vec![QualityFinding::new(
            Severity::Warning,
            FindingCategory::MissingData,
            format!("no {metric} observations"),
        )
        .with_metric(metric)];
    }

    let mut findings: Vec<QualityFinding> = observations
        .iter()
        .filter(|o| !o.is_missing() && !in_range(metric, o.value))
        .map(|o| {
            QualityFinding::new(
                Severity::Error,
                FindingCategory::InvalidValue,
                format!("value {} is not {}", o.value, range_label(metric)),
            )
            .with_metric(metric)
            .on(o.date)
        })
        .collect();

    if metric == Metric::Price {
        let missing = missing_business_days(observations);
        if missing > 0 {
            findings.push(
                QualityFinding::new(
                    Severity::Warning,
                    FindingCategory::DataGaps,
                    format!("missing {missing} trading day(s)"),
                )
                .with_metric(metric),
            );
        }
        findings.extend(price_outliers(observations));
    }

    findings
}

/// Count of finite prices outside `[Q1 - k*IQR, Q3 + k*IQR]`, as one Info finding.
fn price_outliers(observations: &[RawObservation]) -> Option<QualityFinding> {
    let finite: Vec<f64> = observations
        .iter()
        .filter(|o| !o.is_missing())
        .map(|o| o.value)
        .collect();
    if finite.len() <= MIN_IQR_POINTS {
        return None;
    }
    let q1 = stats::quantile(&finite, 0.25)?;
    let q3 = stats::quantile(&finite, 0.75)?;
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr);

    let count = finite.iter().filter(|v| **v < lower || **v > upper).count();
    (count > 0).then(|| {
        QualityFinding::new(
            Severity::Info,
            FindingCategory::Outliers,
            format!("{count} price outlier(s) outside [{lower:.2}, {upper:.2}]"),
        )
        .with_metric(Metric::Price)
    })
}

/// Validate all three series of a symbol. Input order does not matter.
pub fn validate_set(series: &SeriesSet) -> Vec<QualityFinding> {
    Metric::ALL
        .into_iter()
        .flat_map(|metric| {
            let (canonical, _) = canonicalize(metric, series.get(metric).to_vec());
            validate_series(metric, &canonical)
        })
        .collect()
}

/// Weekdays between the first and last observation that carry no observation.
fn missing_business_days(observations: &[RawObservation]) -> usize {
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return 0;
    };

    let mut present = observations.iter().map(|o| o.date).peekable();
    let mut missing = 0;
    let mut day = first.date;
    while day <= last.date {
        let is_weekday = !matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
        while present.next_if(|d| *d < day).is_some() {}
        let observed = present.next_if_eq(&day).is_some();
        if is_weekday && !observed {
            missing += 1;
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    missing
}
