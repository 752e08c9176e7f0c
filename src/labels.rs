//! Selects the annotation labels that fall inside the plotted domain.

use crate::record::{Label, Timestamp};
use crate::series::Series;

/// Inclusive timestamp range `[start, end]` resolved by the chart layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl VisibleRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Filters a sorted label series against a [`VisibleRange`].
#[derive(Debug, Clone, Copy)]
pub struct LabelAligner {
    range: VisibleRange,
}

impl LabelAligner {
    pub fn new(range: VisibleRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> VisibleRange {
        self.range
    }

    /// Labels with `start <= timestamp <= end`, in series order.
    pub fn align<'a>(&self, labels: &'a Series<Label>) -> &'a [Label] {
        let labels = labels.as_slice();
        if self.range.start > self.range.end {
            return &[];
        }
        let lo = labels.partition_point(|label| label.timestamp < self.range.start);
        let hi = labels.partition_point(|label| label.timestamp <= self.range.end);
        &labels[lo..hi]
    }
}
