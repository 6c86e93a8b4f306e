//! Quality finding summaries and logging.

use divergence_core::domain::{FindingCategory, Metric, QualityFinding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Counts of findings by severity, category and metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingSummary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<FindingCategory, usize>,
    pub by_metric: BTreeMap<Metric, usize>,
}

impl FindingSummary {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a QualityFinding>) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            summary.total += 1;
            *summary.by_severity.entry(finding.severity).or_default() += 1;
            *summary.by_category.entry(finding.category).or_default() += 1;
            if let Some(metric) = finding.metric {
                *summary.by_metric.entry(metric).or_default() += 1;
            }
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Plain-text report for terminal output.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Findings: {}", self.total);
        if self.total == 0 {
            return out;
        }
        let _ = writeln!(out, "By severity:");
        for (severity, count) in &self.by_severity {
            let _ = writeln!(out, "  {severity:<8} {count}");
        }
        let _ = writeln!(out, "By category:");
        for (category, count) in &self.by_category {
            let _ = writeln!(out, "  {category:<14} {count}");
        }
        if !self.by_metric.is_empty() {
            let _ = writeln!(out, "By metric:");
            for (metric, count) in &self.by_metric {
                let _ = writeln!(out, "  {metric:<8} {count}");
            }
        }
        out
    }
}

/// Emit one log event per finding, at a level matching its severity.
pub fn log_findings(symbol: &str, findings: &[QualityFinding]) {
    for finding in findings {
        let metric = finding.metric.map(|m| m.as_str()).unwrap_or("-");
        let date = finding.date.map(|d| d.to_string()).unwrap_or_default();
        match finding.severity {
            Severity::Info => tracing::info!(
                symbol,
                metric,
                date = %date,
                category = %finding.category,
                "{}",
                finding.message
            ),
            Severity::Warning | Severity::Error => tracing::warn!(
                symbol,
                metric,
                date = %date,
                severity = %finding.severity,
                category = %finding.category,
                "{}",
                finding.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings() -> Vec<QualityFinding> {
        vec![
            QualityFinding::new(Severity::Warning, FindingCategory::ExtremeScore, "a").with_metric(Metric::Search),
            QualityFinding::new(Severity::Warning, FindingCategory::ExtremeScore, "b").with_metric(Metric::Search),
            QualityFinding::new(Severity::Error, FindingCategory::InvalidValue, "c").with_metric(Metric::Price),
            QualityFinding::new(Severity::Warning, FindingCategory::Completeness, "d").with_metric(Metric::Holdings),
        ]
    }

    #[test]
    fn counts_by_dimension() {
        let summary = FindingSummary::from_findings(&findings());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(Severity::Warning), 3);
        assert_eq!(summary.count(Severity::Error), 1);
        assert_eq!(summary.count(Severity::Info), 0);
        assert_eq!(summary.by_category[&FindingCategory::ExtremeScore], 2);
        assert_eq!(summary.by_metric[&Metric::Search], 2);
        assert!(summary.has_errors());
    }

    #[test]
    fn render_lists_each_group() {
        let text = FindingSummary::from_findings(&findings()).render();
        assert!(text.starts_with("Findings: 4"));
        assert!(text.contains("WARNING"));
        assert!(text.contains("EXTREME_SCORE"));
        assert!(text.contains("holdings"));
    }

    #[test]
    fn summary_serializes_with_readable_keys() {
        let json = serde_json::to_string(&FindingSummary::from_findings(&findings())).unwrap();
        assert!(json.contains(r#""WARNING":3"#));
        assert!(json.contains(r#""search":2"#));
    }

    #[test]
    fn empty_summary() {
        let summary = FindingSummary::from_findings(&Vec::<QualityFinding>::new());
        assert_eq!(summary.render(), "Findings: 0\n");
        assert!(!summary.has_errors());
    }
}
