//! Pushdown predicate construction
//!
//! Translates entity filters and field selection into the store's predicate
//! language. Builders return an empty group when nothing applies, which the
//! store treats as "match everything".

use bytes::Bytes;
use timeline_core::{
    CompareOp, EntityFilters, FieldSelector, FilterOperator, ReadMode, TimelineFilter,
    TimelineFilterList,
};
use timeline_store::{Predicate, ValueComparator};
use tracing::debug;

use crate::schema::{FlowRunColumn, FlowRunSchema};
use crate::selection::FieldBranch;

/// AND of the created-time range and the metric value filters, each present
/// only when the caller restricted it.
pub fn build_time_and_metric_filter(schema: &FlowRunSchema, filters: &EntityFilters) -> Predicate {
    let mut list = Predicate::all();
    if filters.has_time_range() {
        list.push(created_time_range(
            schema,
            filters.created_time_begin,
            filters.created_time_end,
        ));
    }
    if let Some(metric_filters) = filters.metric_filters() {
        list.push(metric_filter_list(schema, metric_filters));
    }
    list
}

/// OR group choosing which columns come back.
pub fn build_field_selection_filter(
    schema: &FlowRunSchema,
    fields: &FieldSelector,
    mode: ReadMode,
) -> Predicate {
    let branch = FieldBranch::for_fields(mode, fields);
    debug!(?branch, ?mode, "Field selection branch");

    let mut list = Predicate::any();
    match (branch, fields.metric_selector()) {
        (FieldBranch::ExcludeMetrics, _) => {
            list.push(Predicate::All(vec![
                Predicate::family(schema.info_family.clone()),
                Predicate::qualifier_prefix(CompareOp::NotEqual, schema.metric.prefix_bytes()),
            ]));
        }
        (FieldBranch::ExplicitMetrics, Some(selector)) => {
            let mut columns = fixed_columns();
            columns.push(metric_filter_list(schema, selector));
            list.push(Predicate::All(vec![
                Predicate::family(schema.info_family.clone()),
                columns,
            ]));
        }
        _ => {}
    }
    list
}

/// Inclusive range over the run's start time, the minimum across versions of
/// the min start time column. Rows without the column never match a bounded range.
pub fn created_time_range(schema: &FlowRunSchema, begin: i64, end: i64) -> Predicate {
    let bound = |op: CompareOp, value: i64| Predicate::ColumnValue {
        family: schema.info_family.clone(),
        qualifier: Bytes::from_static(FlowRunColumn::MinStartTime.qualifier()),
        op,
        comparator: ValueComparator::Long(value),
        filter_if_missing: true,
        fold: FlowRunColumn::MinStartTime.fold(),
    };
    Predicate::All(vec![
        bound(CompareOp::GreaterOrEqual, begin),
        bound(CompareOp::LessOrEqual, end),
    ])
}

/// Translate a caller filter list into comparators scoped to the metric prefix.
pub fn metric_filter_list(schema: &FlowRunSchema, list: &TimelineFilterList) -> Predicate {
    let children = list
        .filters
        .iter()
        .map(|filter| metric_filter(schema, filter))
        .collect();
    match list.operator {
        FilterOperator::And => Predicate::All(children),
        FilterOperator::Or => Predicate::Any(children),
    }
}

fn metric_filter(schema: &FlowRunSchema, filter: &TimelineFilter) -> Predicate {
    match filter {
        TimelineFilter::Compare {
            op,
            key,
            value,
            key_must_exist,
        } => Predicate::ColumnValue {
            family: schema.info_family.clone(),
            qualifier: schema.metric.qualifier(key),
            op: *op,
            comparator: ValueComparator::Long(*value),
            filter_if_missing: *key_must_exist,
            fold: Some(schema.metric.fold()),
        },
        TimelineFilter::Prefix { op, prefix } => {
            Predicate::qualifier_prefix(*op, schema.metric.qualifier(prefix))
        }
        TimelineFilter::List(list) => metric_filter_list(schema, list),
    }
}

/// One exact-qualifier predicate per fixed column, OR'ed.
fn fixed_columns() -> Predicate {
    Predicate::Any(
        FlowRunColumn::ALL
            .iter()
            .map(|column| Predicate::qualifier(Bytes::from_static(column.qualifier())))
            .collect(),
    )
}
