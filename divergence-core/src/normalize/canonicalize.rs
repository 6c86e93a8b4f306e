//! Put raw loader output into ascending, duplicate-free date order.

use crate::domain::{FindingCategory, Metric, QualityFinding, RawObservation, Severity};

/// Sort ascending by date and keep the first observation of each duplicate date.
///
/// Returns a warning when the input had to be changed. Already canonical
/// input is returned as-is with no finding.
pub fn canonicalize(
    metric: Metric,
    observations: Vec<RawObservation>,
) -> (Vec<RawObservation>, Option<QualityFinding>) {
    let sorted = observations.windows(2).all(|w| w[0].date < w[1].date);
    if sorted {
        return (observations, None);
    }

    let original_len = observations.len();
    let mut out = observations;
    // Stable: the first of several same-date observations stays first.
    out.sort_by_key(|o| o.date);
    out.dedup_by_key(|o| o.date);

    let dropped = original_len - out.len();
    let message = if dropped > 0 {
        format!("input was out of order or had duplicate dates; dropped {dropped} duplicate(s)")
    } else {
        "input was out of order; sorted by date".to_string()
    };
    let finding = QualityFinding::new(Severity::Warning, FindingCategory::Canonicalized, message)
        .with_metric(metric);
    (out, Some(finding))
}
