//! Merge strategies for multi-version columns
//!
//! A column or column prefix declares how repeated versions of one qualifier
//! collapse into a single value. Readers and value predicates fold versions
//! oldest first, so both see the same merged value.

use std::fmt;

pub trait Aggregator: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn merge(&self, existing: i64, incoming: i64) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Aggregator for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn merge(&self, existing: i64, incoming: i64) -> i64 {
        existing.saturating_add(incoming)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl Aggregator for Min {
    fn name(&self) -> &'static str {
        "min"
    }

    fn merge(&self, existing: i64, incoming: i64) -> i64 {
        existing.min(incoming)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl Aggregator for Max {
    fn name(&self) -> &'static str {
        "max"
    }

    fn merge(&self, existing: i64, incoming: i64) -> i64 {
        existing.max(incoming)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriteWins;

impl Aggregator for LastWriteWins {
    fn name(&self) -> &'static str {
        "last_write_wins"
    }

    fn merge(&self, _existing: i64, incoming: i64) -> i64 {
        incoming
    }
}

/// Result of folding a column's versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatedValue {
    pub value: i64,
    /// Timestamp of the newest merged version
    pub timestamp: i64,
}

/// Fold `(timestamp, value)` versions in timestamp order. `None` for no versions.
pub fn fold_versions(
    aggregator: &dyn Aggregator,
    versions: impl IntoIterator<Item = (i64, i64)>,
) -> Option<AggregatedValue> {
    let mut versions: Vec<(i64, i64)> = versions.into_iter().collect();
    versions.sort_by_key(|(timestamp, _)| *timestamp);

    let mut iter = versions.into_iter();
    let (timestamp, value) = iter.next()?;
    Some(iter.fold(AggregatedValue { value, timestamp }, |acc, (ts, v)| AggregatedValue {
        value: aggregator.merge(acc.value, v),
        timestamp: ts,
    }))
}
