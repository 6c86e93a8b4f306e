//! Cross-frequency merger: daily table from three native-cadence score series.
//!
//! For each day and metric, an exact-date point wins. Otherwise the most
//! recent earlier point is carried forward while it is no more than the
//! metric's `max_gap_days` old; past that the cell is undefined. A stale value
//! is never propagated indefinitely.

use crate::config::{NormalizationConfig, Timeline};
use crate::domain::{Cell, MergedRow, Metric, Score, StandardizedPoint};
use chrono::{Days, NaiveDate};

/// Walks one metric's points in step with an ascending timeline.
struct MetricCursor<'a> {
    points: &'a [StandardizedPoint],
    /// Index of the next point not yet at or before the current day.
    next: usize,
    max_gap_days: i64,
}

impl<'a> MetricCursor<'a> {
    fn new(points: &'a [StandardizedPoint], max_gap_days: i64) -> Self {
        Self {
            points,
            next: 0,
            max_gap_days,
        }
    }

    /// Cell for `day`. Days must be requested in ascending order.
    fn cell_at(&mut self, day: NaiveDate) -> Cell {
        while self.next < self.points.len() && self.points[self.next].date <= day {
            self.next += 1;
        }
        let Some(latest) = self.next.checked_sub(1).map(|i| &self.points[i]) else {
            return Cell::Undefined;
        };

        match latest.score {
            Score::Undefined(_) => Cell::Undefined,
            Score::Defined(value) if latest.date == day => Cell::Observed { value },
            Score::Defined(value) => {
                let gap = (day - latest.date).num_days();
                if gap <= self.max_gap_days {
                    Cell::Filled {
                        value,
                        source: latest.date,
                    }
                } else {
                    Cell::Undefined
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossFrequencyMerger {
    price_gap: i64,
    holdings_gap: i64,
    search_gap: i64,
    timeline: Timeline,
}

impl CrossFrequencyMerger {
    pub fn new(config: &NormalizationConfig) -> Self {
        Self {
            price_gap: config.price.max_gap_days,
            holdings_gap: config.holdings.max_gap_days,
            search_gap: config.search.max_gap_days,
            timeline: config.timeline,
        }
    }

    /// Merge three ascending point series into one row per timeline day.
    pub fn merge(
        &self,
        price: &[StandardizedPoint],
        holdings: &[StandardizedPoint],
        search: &[StandardizedPoint],
    ) -> Vec<MergedRow> {
        let days = self.timeline_days(price, holdings, search);

        let mut cursors = [
            (Metric::Price, MetricCursor::new(price, self.price_gap)),
            (Metric::Holdings, MetricCursor::new(holdings, self.holdings_gap)),
            (Metric::Search, MetricCursor::new(search, self.search_gap)),
        ];

        days.into_iter()
            .map(|day| {
                let mut row = MergedRow::empty(day);
                for (metric, cursor) in cursors.iter_mut() {
                    *row.cell_mut(*metric) = cursor.cell_at(day);
                }
                row
            })
            .collect()
    }

    fn timeline_days(
        &self,
        price: &[StandardizedPoint],
        holdings: &[StandardizedPoint],
        search: &[StandardizedPoint],
    ) -> Vec<NaiveDate> {
        if self.timeline == Timeline::PriceDates && !price.is_empty() {
            return price.iter().map(|p| p.date).collect();
        }

        let series = [price, holdings, search];
        let first = series.iter().filter_map(|s| s.first()).map(|p| p.date).min();
        let last = series.iter().filter_map(|s| s.last()).map(|p| p.date).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Vec::new();
        };

        let mut days = Vec::with_capacity((last - first).num_days() as usize + 1);
        let mut day = first;
        while day <= last {
            days.push(day);
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }
}
