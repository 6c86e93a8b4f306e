//! Domain types for the normalization pipeline.

pub mod finding;
pub mod merged;
pub mod metric;
pub mod observation;
pub mod score;

pub use finding::{FindingCategory, QualityFinding, Severity};
pub use merged::{Cell, MergedRow};
pub use metric::{Cadence, Metric, ParseMetricError};
pub use observation::{DatasetHash, RawObservation, SeriesSet};
pub use score::{Score, StandardizedPoint, UndefinedReason};

/// Symbol type alias
pub type Symbol = String;
