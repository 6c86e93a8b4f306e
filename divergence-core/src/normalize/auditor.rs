//! Quality auditor: advisory checks over the merged table.
//!
//! Never mutates the table and never fails a run.

use crate::domain::{FindingCategory, MergedRow, Metric, QualityFinding, Severity};
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct QualityAuditor {
    extreme_threshold: f64,
    max_undefined_share: f64,
}

impl QualityAuditor {
    pub fn new(extreme_threshold: f64, max_undefined_share: f64) -> Self {
        Self {
            extreme_threshold,
            max_undefined_share,
        }
    }

    pub fn audit(&self, rows: &[MergedRow]) -> Vec<QualityFinding> {
        let mut findings = Vec::new();
        for metric in Metric::ALL {
            findings.extend(self.extreme_scores(rows, metric));
            findings.extend(self.completeness(rows, metric));
        }
        findings
    }

    /// One warning per native score beyond the threshold, dated at the
    /// observation it came from. A score reached only through forward-filled
    /// cells (a weekend point on a price-dates timeline) is still flagged once.
    fn extreme_scores(&self, rows: &[MergedRow], metric: Metric) -> Vec<QualityFinding> {
        let mut flagged: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut findings = Vec::new();
        for row in rows {
            let cell = row.cell(metric);
            let (Some(value), Some(source)) = (cell.value(), cell.source_date(row.date)) else {
                continue;
            };
            if value.abs() <= self.extreme_threshold || !flagged.insert(source) {
                continue;
            }
            findings.push(
                QualityFinding::new(
                    Severity::Warning,
                    FindingCategory::ExtremeScore,
                    format!("|z| = {:.2} exceeds {}", value.abs(), self.extreme_threshold),
                )
                .with_metric(metric)
                .on(source),
            );
        }
        findings
    }

    fn completeness(&self, rows: &[MergedRow], metric: Metric) -> Option<QualityFinding> {
        if rows.is_empty() {
            return None;
        }
        let undefined = rows.iter().filter(|r| r.cell(metric).is_undefined()).count();
        let share = undefined as f64 / rows.len() as f64;
        (share > self.max_undefined_share).then(|| {
            QualityFinding::new(
                Severity::Warning,
                FindingCategory::Completeness,
                format!(
                    "{undefined} of {} days undefined ({:.1}%)",
                    rows.len(),
                    share * 100.0
                ),
            )
            .with_metric(metric)
        })
    }
}
