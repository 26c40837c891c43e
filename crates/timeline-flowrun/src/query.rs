//! Validated flow run queries and the physical reads they resolve to

use timeline_core::{
    EntityFilters, FieldSelector, QueryContext, ReadMode, ReaderConfig, Result, TimelineError,
};
use timeline_store::{Get, Predicate, Scan, VersionPolicy};

use crate::filter::{build_field_selection_filter, build_time_and_metric_filter};
use crate::row_key::FlowRunRowKey;
use crate::schema::FlowRunSchema;

/// What to hand the store client
#[derive(Debug, Clone)]
pub enum ReadTarget {
    Get(Get),
    Scan(Scan),
}

/// Reject a context that cannot address the flow run table.
pub fn validate_context(context: &QueryContext, mode: ReadMode) -> Result<()> {
    require("cluster id", &context.cluster_id)?;
    require("user id", &context.user_id)?;
    require("flow name", &context.flow_name)?;
    if mode == ReadMode::Single && context.flow_run_id.is_none() {
        return Err(TimelineError::Validation(
            "flow run id is required for a single entity read".to_string(),
        ));
    }
    Ok(())
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TimelineError::Validation(format!("{} shouldn't be empty", name)));
    }
    Ok(())
}

/// Key or prefix plus execution plan for one query.
///
/// Single reads fetch every stored version of the exact row; the predicate is
/// attached only when non-empty. Range reads are bounded by the flow's key
/// prefix and always carry a page limit, AND'ed with any other predicate. A
/// `limit` of `None` or zero means the configured default.
pub fn resolve_read_target(
    config: &ReaderConfig,
    context: &QueryContext,
    mode: ReadMode,
    predicate: Predicate,
    limit: Option<u64>,
) -> Result<ReadTarget> {
    validate_context(context, mode)?;
    let table = config.flow_run_table.as_str();

    match (mode, context.flow_run_id) {
        (ReadMode::Single, Some(run_id)) => {
            let key = FlowRunRowKey::new(
                context.cluster_id.as_str(),
                context.user_id.as_str(),
                context.flow_name.as_str(),
                run_id,
            );
            Ok(ReadTarget::Get(
                Get::new(table, key.encode())
                    .with_versions(VersionPolicy::All)
                    .with_predicate(predicate),
            ))
        }
        (ReadMode::Single, None) => Err(TimelineError::Validation(
            "flow run id is required for a single entity read".to_string(),
        )),
        (ReadMode::Range, _) => {
            let prefix =
                FlowRunRowKey::prefix(&context.cluster_id, &context.user_id, &context.flow_name);
            let limit = config.effective_limit(limit);
            let mut plan = Predicate::All(vec![Predicate::PageLimit(limit)]);
            if !predicate.is_empty() {
                plan.push(predicate);
            }
            Ok(ReadTarget::Scan(
                Scan::new(table, prefix)
                    .with_versions(VersionPolicy::All)
                    .with_predicate(plan),
            ))
        }
    }
}

/// A flow run read request that passed validation.
#[derive(Debug, Clone)]
pub struct FlowRunQuery {
    context: QueryContext,
    mode: ReadMode,
    filters: EntityFilters,
    fields: FieldSelector,
}

impl FlowRunQuery {
    pub fn single(context: QueryContext, fields: FieldSelector) -> Result<Self> {
        Self::new(context, ReadMode::Single, EntityFilters::default(), fields)
    }

    pub fn range(context: QueryContext, filters: EntityFilters, fields: FieldSelector) -> Result<Self> {
        Self::new(context, ReadMode::Range, filters, fields)
    }

    fn new(
        context: QueryContext,
        mode: ReadMode,
        filters: EntityFilters,
        fields: FieldSelector,
    ) -> Result<Self> {
        validate_context(&context, mode)?;
        Ok(Self {
            context,
            mode,
            filters,
            fields: fields.augmented(),
        })
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn fields(&self) -> &FieldSelector {
        &self.fields
    }

    pub fn filters(&self) -> &EntityFilters {
        &self.filters
    }

    /// Entity filters do not apply to an exact-key read.
    pub fn predicate(&self, schema: &FlowRunSchema) -> Predicate {
        let by_fields = build_field_selection_filter(schema, &self.fields, self.mode);
        match self.mode {
            ReadMode::Single => by_fields,
            ReadMode::Range => combine(build_time_and_metric_filter(schema, &self.filters), by_fields),
        }
    }

    pub fn limit(&self, config: &ReaderConfig) -> u64 {
        config.effective_limit(self.filters.limit)
    }

    pub fn read_target(&self, schema: &FlowRunSchema, config: &ReaderConfig) -> Result<ReadTarget> {
        resolve_read_target(
            config,
            &self.context,
            self.mode,
            self.predicate(schema),
            self.filters.limit,
        )
    }
}

fn combine(by_filters: Predicate, by_fields: Predicate) -> Predicate {
    match (by_filters.is_empty(), by_fields.is_empty()) {
        (false, false) => Predicate::All(vec![by_filters, by_fields]),
        (false, true) => by_filters,
        (true, false) => by_fields,
        (true, true) => Predicate::all(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::Field;

    fn context() -> QueryContext {
        QueryContext::new("c1", "u1", "f1")
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        for ctx in [
            QueryContext::new("", "u1", "f1"),
            QueryContext::new("c1", " ", "f1"),
            QueryContext::new("c1", "u1", ""),
        ] {
            for mode in [ReadMode::Single, ReadMode::Range] {
                let err = validate_context(&ctx.clone().with_run(1), mode).unwrap_err();
                assert!(matches!(err, TimelineError::Validation(_)));
            }
        }
    }

    #[test]
    fn test_single_read_requires_run() {
        assert!(FlowRunQuery::single(context(), FieldSelector::default()).is_err());
        assert!(FlowRunQuery::range(context(), EntityFilters::default(), FieldSelector::default()).is_ok());
        let config = ReaderConfig::default();
        assert!(resolve_read_target(&config, &context(), ReadMode::Single, Predicate::all(), None).is_err());
    }

    #[test]
    fn test_zero_limit_uses_default_cap() {
        let config = ReaderConfig::default();
        for limit in [None, Some(0)] {
            let ReadTarget::Scan(scan) =
                resolve_read_target(&config, &context(), ReadMode::Range, Predicate::all(), limit)
                    .unwrap()
            else {
                panic!("expected a scan");
            };
            assert_eq!(scan.row_cap(), Some(100));
        }

        let ReadTarget::Scan(scan) =
            resolve_read_target(&config, &context(), ReadMode::Range, Predicate::all(), Some(7))
                .unwrap()
        else {
            panic!("expected a scan");
        };
        assert_eq!(scan.row_cap(), Some(7));
    }

    #[test]
    fn test_single_target() {
        let query = FlowRunQuery::single(context().with_run(42), FieldSelector::default()).unwrap();
        let target = query
            .read_target(&FlowRunSchema::default(), &ReaderConfig::default())
            .unwrap();
        let ReadTarget::Get(get) = target else {
            panic!("expected a get");
        };
        assert_eq!(get.table, "timelineservice.flowrun");
        assert_eq!(get.row, FlowRunRowKey::new("c1", "u1", "f1", 42).encode());
        assert_eq!(get.versions, VersionPolicy::All);
        assert!(get.predicate.is_none());
    }

    #[test]
    fn test_single_target_ignores_entity_filters() {
        let query = FlowRunQuery::new(
            context().with_run(42),
            ReadMode::Single,
            EntityFilters::default().with_created_time(5, 10),
            FieldSelector::default(),
        )
        .unwrap();
        assert!(query.predicate(&FlowRunSchema::default()).is_empty());
    }

    #[test]
    fn test_range_target_always_capped() {
        let query = FlowRunQuery::range(
            context(),
            EntityFilters::default(),
            FieldSelector::new([Field::Metrics]),
        )
        .unwrap();
        let ReadTarget::Scan(scan) = query
            .read_target(&FlowRunSchema::default(), &ReaderConfig::default())
            .unwrap()
        else {
            panic!("expected a scan");
        };
        assert_eq!(scan.prefix, FlowRunRowKey::prefix("c1", "u1", "f1"));
        assert_eq!(scan.row_cap(), Some(100));
        assert_eq!(scan.predicate, Some(Predicate::All(vec![Predicate::PageLimit(100)])));
    }

    #[test]
    fn test_range_target_combines_filters_and_fields() {
        let query = FlowRunQuery::range(
            context(),
            EntityFilters::default().with_created_time(1, 2).with_limit(50),
            FieldSelector::default(),
        )
        .unwrap();
        let schema = FlowRunSchema::default();
        let ReadTarget::Scan(scan) = query.read_target(&schema, &ReaderConfig::default()).unwrap() else {
            panic!("expected a scan");
        };
        assert_eq!(scan.row_cap(), Some(50));
        let Some(Predicate::All(children)) = &scan.predicate else {
            panic!("expected an AND plan");
        };
        assert_eq!(children[0], Predicate::PageLimit(50));
        assert_eq!(children[1], query.predicate(&schema));
        assert!(matches!(&children[1], Predicate::All(parts) if parts.len() == 2));
    }

    #[test]
    fn test_metric_selector_augments_fields() {
        let fields = FieldSelector::default().with_metrics_to_retrieve(
            timeline_core::TimelineFilterList::or(vec![timeline_core::TimelineFilter::prefix("M")]),
        );
        let query = FlowRunQuery::range(context(), EntityFilters::default(), fields).unwrap();
        assert!(query.fields().has_field(Field::Metrics));
    }
}
