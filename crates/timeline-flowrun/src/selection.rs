//! Column selection policy
//!
//! Which columns a read fetches is a decision over three inputs: read mode,
//! whether metrics were requested, and whether an explicit metric selector was
//! supplied. Single-entity reads always carry metrics.

use timeline_core::{Field, FieldSelector, ReadMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldBranch {
    /// Whole info family minus the metric prefix
    ExcludeMetrics,
    /// Fixed columns plus the selected metrics
    ExplicitMetrics,
    /// No column predicate at all
    Everything,
}

/// | mode   | metrics requested | selector | branch          |
/// |--------|-------------------|----------|-----------------|
/// | any    | any               | yes      | ExplicitMetrics |
/// | range  | no                | no       | ExcludeMetrics  |
/// | range  | yes               | no       | Everything      |
/// | single | any               | no       | Everything      |
pub fn select_branch(mode: ReadMode, metrics_requested: bool, has_selector: bool) -> FieldBranch {
    match (mode, metrics_requested, has_selector) {
        (_, _, true) => FieldBranch::ExplicitMetrics,
        (ReadMode::Range, false, false) => FieldBranch::ExcludeMetrics,
        (ReadMode::Range, true, false) | (ReadMode::Single, _, false) => FieldBranch::Everything,
    }
}

impl FieldBranch {
    pub fn for_fields(mode: ReadMode, fields: &FieldSelector) -> Self {
        select_branch(
            mode,
            fields.has_field(Field::Metrics),
            fields.metric_selector().is_some(),
        )
    }
}

/// Whether parsed entities get their metrics populated.
pub fn reads_metrics(mode: ReadMode, fields: &FieldSelector) -> bool {
    mode == ReadMode::Single || fields.has_field(Field::Metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::{TimelineFilter, TimelineFilterList};

    #[test]
    fn test_decision_table() {
        use FieldBranch::*;
        use ReadMode::*;

        let cases = [
            (Single, false, false, Everything),
            (Single, true, false, Everything),
            (Single, false, true, ExplicitMetrics),
            (Single, true, true, ExplicitMetrics),
            (Range, false, false, ExcludeMetrics),
            (Range, true, false, Everything),
            (Range, false, true, ExplicitMetrics),
            (Range, true, true, ExplicitMetrics),
        ];
        for (mode, metrics, selector, expected) in cases {
            assert_eq!(
                select_branch(mode, metrics, selector),
                expected,
                "{:?} metrics={} selector={}",
                mode,
                metrics,
                selector
            );
        }
    }

    #[test]
    fn test_single_reads_always_read_metrics() {
        assert!(reads_metrics(ReadMode::Single, &FieldSelector::default()));
        assert!(!reads_metrics(ReadMode::Range, &FieldSelector::default()));
        assert!(reads_metrics(ReadMode::Range, &FieldSelector::new([Field::All])));
    }

    #[test]
    fn test_empty_selector_is_no_selector() {
        let fields = FieldSelector::default().with_metrics_to_retrieve(TimelineFilterList::default());
        assert_eq!(
            FieldBranch::for_fields(ReadMode::Range, &fields),
            FieldBranch::ExcludeMetrics
        );

        let fields = FieldSelector::default()
            .with_metrics_to_retrieve(TimelineFilterList::or(vec![TimelineFilter::prefix("MAP")]));
        assert_eq!(
            FieldBranch::for_fields(ReadMode::Range, &fields),
            FieldBranch::ExplicitMetrics
        );
    }
}
