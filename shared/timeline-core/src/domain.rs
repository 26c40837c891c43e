//! Core domain types shared by timeline readers

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use timeline_store::CompareOp;
use timeline_store::AggregatedValue;

/// Whether a read targets one entity by exact key or every entity under a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    Single,
    Range,
}

/// Identity of the entity or entities a query reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub cluster_id: String,
    pub user_id: String,
    pub flow_name: String,
    pub flow_run_id: Option<i64>,
}

impl QueryContext {
    pub fn new(
        cluster_id: impl Into<String>,
        user_id: impl Into<String>,
        flow_name: impl Into<String>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            user_id: user_id.into(),
            flow_name: flow_name.into(),
            flow_run_id: None,
        }
    }

    pub fn with_run(mut self, flow_run_id: i64) -> Self {
        self.flow_run_id = Some(flow_run_id);
        self
    }
}

impl fmt::Display for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.cluster_id, self.user_id, self.flow_name)?;
        if let Some(run) = self.flow_run_id {
            write!(f, "/{}", run)?;
        }
        Ok(())
    }
}

/// How the children of a filter list combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

/// Caller-side filter over metric names and values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineFilter {
    /// `metric(key) op value`; rows lacking the metric fail when `key_must_exist`
    Compare {
        op: CompareOp,
        key: String,
        value: i64,
        key_must_exist: bool,
    },
    /// Metric id starts (or, with `NotEqual`, does not start) with `prefix`
    Prefix { op: CompareOp, prefix: String },
    List(TimelineFilterList),
}

impl TimelineFilter {
    pub fn compare(op: CompareOp, key: impl Into<String>, value: i64) -> Self {
        Self::Compare {
            op,
            key: key.into(),
            value,
            key_must_exist: true,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix {
            op: CompareOp::Equal,
            prefix: prefix.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimelineFilterList {
    pub operator: FilterOperator,
    pub filters: Vec<TimelineFilter>,
}

impl TimelineFilterList {
    pub fn new(operator: FilterOperator, filters: Vec<TimelineFilter>) -> Self {
        Self { operator, filters }
    }

    pub fn and(filters: Vec<TimelineFilter>) -> Self {
        Self::new(FilterOperator::And, filters)
    }

    pub fn or(filters: Vec<TimelineFilter>) -> Self {
        Self::new(FilterOperator::Or, filters)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Restrictions applied to range reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilters {
    pub created_time_begin: i64,
    pub created_time_end: i64,
    pub metric_filters: Option<TimelineFilterList>,
    /// Row cap for scans; `None` or zero means the reader default
    pub limit: Option<u64>,
}

impl Default for EntityFilters {
    fn default() -> Self {
        Self {
            created_time_begin: 0,
            created_time_end: i64::MAX,
            metric_filters: None,
            limit: None,
        }
    }
}

impl EntityFilters {
    pub fn with_created_time(mut self, begin: i64, end: i64) -> Self {
        self.created_time_begin = begin;
        self.created_time_end = end;
        self
    }

    pub fn with_metric_filters(mut self, filters: TimelineFilterList) -> Self {
        self.metric_filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// False when both bounds are at their defaults.
    pub fn has_time_range(&self) -> bool {
        self.created_time_begin != 0 || self.created_time_end != i64::MAX
    }

    pub fn metric_filters(&self) -> Option<&TimelineFilterList> {
        self.metric_filters.as_ref().filter(|f| !f.is_empty())
    }
}

/// Logical field groups a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    All,
    Info,
    Configs,
    Events,
    IsRelatedTo,
    RelatesTo,
    Metrics,
}

/// Which parts of an entity to retrieve
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldSelector {
    pub fields: BTreeSet<Field>,
    pub metrics_to_retrieve: Option<TimelineFilterList>,
}

impl FieldSelector {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            metrics_to_retrieve: None,
        }
    }

    pub fn with_metrics_to_retrieve(mut self, metrics: TimelineFilterList) -> Self {
        self.metrics_to_retrieve = Some(metrics);
        self
    }

    /// `All` implies every field.
    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&Field::All) || self.fields.contains(&field)
    }

    pub fn metric_selector(&self) -> Option<&TimelineFilterList> {
        self.metrics_to_retrieve.as_ref().filter(|m| !m.is_empty())
    }

    /// A non-empty metric selector implies the caller wants metrics.
    pub fn augmented(mut self) -> Self {
        if self.metric_selector().is_some() {
            self.fields.insert(Field::Metrics);
        }
        self
    }
}

/// A metric after all of its stored versions have been merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub value: i64,
    /// Timestamp of the newest merged version
    pub timestamp: i64,
}

impl From<AggregatedValue> for AggregatedMetric {
    fn from(merged: AggregatedValue) -> Self {
        Self {
            value: merged.value,
            timestamp: merged.timestamp,
        }
    }
}

/// One execution of a flow, as read back from storage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowRunEntity {
    pub user: String,
    pub name: String,
    pub run_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub metrics: BTreeMap<String, AggregatedMetric>,
}

impl FlowRunEntity {
    pub fn new(user: impl Into<String>, name: impl Into<String>, run_id: i64) -> Self {
        Self {
            user: user.into(),
            name: name.into(),
            run_id,
            ..Default::default()
        }
    }

    /// `user@flow/run`
    pub fn id(&self) -> String {
        format!("{}@{}/{}", self.user, self.name, self.run_id)
    }

    pub fn metric_value(&self, id: &str) -> Option<i64> {
        self.metrics.get(id).map(|m| m.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_default_has_no_time_range() {
        let filters = EntityFilters::default();
        assert!(!filters.has_time_range());
        assert!(filters.metric_filters().is_none());
        assert!(EntityFilters::default().with_created_time(5, i64::MAX).has_time_range());
        assert!(EntityFilters::default().with_created_time(0, 10).has_time_range());
    }

    #[test]
    fn test_empty_metric_filters_are_ignored() {
        let filters = EntityFilters::default().with_metric_filters(TimelineFilterList::default());
        assert!(filters.metric_filters().is_none());
    }

    #[test]
    fn test_all_implies_metrics() {
        assert!(FieldSelector::new([Field::All]).has_field(Field::Metrics));
        assert!(!FieldSelector::new([Field::Info]).has_field(Field::Metrics));
    }

    #[test]
    fn test_metric_selector_adds_metrics_field() {
        let selector = FieldSelector::default()
            .with_metrics_to_retrieve(TimelineFilterList::or(vec![TimelineFilter::prefix("MAP")]))
            .augmented();
        assert!(selector.has_field(Field::Metrics));

        let empty = FieldSelector::default()
            .with_metrics_to_retrieve(TimelineFilterList::default())
            .augmented();
        assert!(!empty.has_field(Field::Metrics));
    }

    #[test]
    fn test_entity_id_and_serialization() {
        let mut run = FlowRunEntity::new("u1", "f1", 42);
        run.start_time = Some(100);
        assert_eq!(run.id(), "u1@f1/42");

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["start_time"], 100);
        assert!(json.get("max_end_time").is_none());
        assert!(json["metrics"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_context_display() {
        let ctx = QueryContext::new("c1", "u1", "f1");
        assert_eq!(ctx.to_string(), "c1/u1@f1");
        assert_eq!(ctx.with_run(7).to_string(), "c1/u1@f1/7");
    }

    #[test]
    fn test_filter_serde_shape() {
        let filter = TimelineFilter::compare(CompareOp::GreaterOrEqual, "MAPS", 3);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["type"], "compare");
        assert_eq!(json["op"], "greater_or_equal");
    }
}
