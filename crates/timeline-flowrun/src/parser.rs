//! Flow run result parsing
//!
//! Rebuilds a [`FlowRunEntity`] from whatever cells survived the read's
//! predicate. Every field is optional on its own; only an undecodable row key
//! is an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use timeline_core::{
    AggregatedMetric, FieldSelector, FlowRunEntity, QueryContext, ReadMode, Result, TimelineError,
};
use timeline_store::{fold_versions, RawRow};
use tracing::{trace, warn};

use crate::row_key::FlowRunRowKey;
use crate::schema::{decode_long, FlowRunColumn, FlowRunSchema};
use crate::selection::reads_metrics;

#[derive(Debug, Clone)]
pub struct FlowRunParser {
    schema: Arc<FlowRunSchema>,
}

impl FlowRunParser {
    pub fn new(schema: Arc<FlowRunSchema>) -> Self {
        Self { schema }
    }

    pub fn parse_row(
        &self,
        row: &RawRow,
        context: &QueryContext,
        mode: ReadMode,
        fields: &FieldSelector,
    ) -> Result<FlowRunEntity> {
        let run_id = match mode {
            ReadMode::Single => context.flow_run_id.ok_or_else(|| {
                TimelineError::Validation(
                    "flow run id is required for a single entity read".to_string(),
                )
            })?,
            ReadMode::Range => FlowRunRowKey::decode(&row.key)
                .map_err(|err| {
                    warn!(key = ?String::from_utf8_lossy(&row.key), "Undecodable flow run row key");
                    err
                })?
                .flow_run_id,
        };

        let mut flow_run =
            FlowRunEntity::new(context.user_id.as_str(), context.flow_name.as_str(), run_id);
        flow_run.start_time = self.read_long(row, FlowRunColumn::MinStartTime);
        flow_run.max_end_time = self.read_long(row, FlowRunColumn::MaxEndTime);
        flow_run.version = self.read_string(row, FlowRunColumn::FlowVersion);

        if reads_metrics(mode, fields) {
            flow_run.metrics = self.read_metrics(row);
        }

        trace!(id = %flow_run.id(), metrics = flow_run.metrics.len(), "Parsed flow run");
        Ok(flow_run)
    }

    fn read_long(&self, row: &RawRow, column: FlowRunColumn) -> Option<i64> {
        let versions = row.versions(&self.schema.info_family, column.qualifier());
        let decoded = versions.iter().filter_map(|cell| {
            let value = decode_long(&cell.value);
            if value.is_none() {
                warn!(column = ?column, "Skipping undecodable value");
            }
            value.map(|v| (cell.timestamp, v))
        });

        match column.aggregator() {
            Some(aggregator) => fold_versions(aggregator, decoded).map(|m| m.value),
            // versions are newest first
            None => decoded.map(|(_, v)| v).next(),
        }
    }

    fn read_string(&self, row: &RawRow, column: FlowRunColumn) -> Option<String> {
        let cell = row.latest(&self.schema.info_family, column.qualifier())?;
        match String::from_utf8(cell.value.to_vec()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(column = ?column, "Skipping non UTF-8 value");
                None
            }
        }
    }

    fn read_metrics(&self, row: &RawRow) -> BTreeMap<String, AggregatedMetric> {
        let prefix = &self.schema.metric;
        let mut points: BTreeMap<String, Vec<(i64, i64)>> = BTreeMap::new();
        for cell in row.with_qualifier_prefix(&self.schema.info_family, &prefix.prefix_bytes()) {
            let Some(id) = prefix.column_id(&cell.qualifier) else {
                warn!(qualifier = ?String::from_utf8_lossy(&cell.qualifier), "Skipping undecodable metric id");
                continue;
            };
            match decode_long(&cell.value) {
                Some(value) => points.entry(id).or_default().push((cell.timestamp, value)),
                None => warn!(metric = %id, "Skipping undecodable metric value"),
            }
        }

        points
            .into_iter()
            .filter_map(|(id, versions)| {
                fold_versions(prefix.aggregator(), versions).map(|merged| (id, merged.into()))
            })
            .collect()
    }
}
