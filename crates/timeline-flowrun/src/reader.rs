//! Flow run reader
//!
//! Validates a request, resolves it to a Get or Scan, runs it against the
//! store client and parses what comes back. Store failures propagate
//! unchanged; nothing is retried or cached here.

use std::sync::Arc;

use futures_util::TryStreamExt;
use timeline_core::{
    EntityFilters, FieldSelector, FlowRunEntity, QueryContext, ReaderConfig, Result,
};
use timeline_store::{RawRow, StoreClient};
use tracing::{debug, instrument};

use crate::parser::FlowRunParser;
use crate::query::{FlowRunQuery, ReadTarget};
use crate::schema::FlowRunSchema;

pub struct FlowRunReader<S> {
    store: S,
    schema: Arc<FlowRunSchema>,
    parser: FlowRunParser,
    config: ReaderConfig,
}

impl<S: StoreClient> FlowRunReader<S> {
    pub fn new(store: S, config: ReaderConfig) -> Self {
        Self::with_schema(store, config, FlowRunSchema::default())
    }

    pub fn with_schema(store: S, config: ReaderConfig, schema: FlowRunSchema) -> Self {
        let schema = Arc::new(schema);
        Self {
            store,
            parser: FlowRunParser::new(schema.clone()),
            schema,
            config,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read one run. `Ok(None)` when the row is absent or nothing survived the predicate.
    #[instrument(skip_all, fields(context = %context))]
    pub async fn read_entity(
        &self,
        context: &QueryContext,
        fields: &FieldSelector,
    ) -> Result<Option<FlowRunEntity>> {
        let query = FlowRunQuery::single(context.clone(), fields.clone())?;
        Ok(self.execute(&query).await?.into_iter().next())
    }

    /// Read the newest runs of one flow, at most `limit` of them.
    #[instrument(skip_all, fields(context = %context))]
    pub async fn read_entities(
        &self,
        context: &QueryContext,
        filters: &EntityFilters,
        fields: &FieldSelector,
    ) -> Result<Vec<FlowRunEntity>> {
        let query = FlowRunQuery::range(context.clone(), filters.clone(), fields.clone())?;
        self.execute(&query).await
    }

    async fn execute(&self, query: &FlowRunQuery) -> Result<Vec<FlowRunEntity>> {
        match query.read_target(&self.schema, &self.config)? {
            ReadTarget::Get(get) => {
                debug!(predicate = ?get.predicate.as_ref().map(|p| p.to_string()), "Reading flow run");
                self.store
                    .get(&get)
                    .await?
                    .filter(|row| !row.is_empty())
                    .map(|row| self.parse(query, &row))
                    .into_iter()
                    .collect()
            }
            ReadTarget::Scan(scan) => {
                let limit = query.limit(&self.config) as usize;
                debug!(limit, predicate = ?scan.predicate.as_ref().map(|p| p.to_string()), "Scanning flow runs");

                let mut rows = self.store.scan(&scan).await?;
                let mut runs = Vec::new();
                while runs.len() < limit {
                    let Some(row) = rows.try_next().await? else {
                        break;
                    };
                    if !row.is_empty() {
                        runs.push(self.parse(query, &row)?);
                    }
                }

                debug!(runs = runs.len(), "Flow run scan complete");
                Ok(runs)
            }
        }
    }

    fn parse(&self, query: &FlowRunQuery, row: &RawRow) -> Result<FlowRunEntity> {
        self.parser
            .parse_row(row, query.context(), query.mode(), query.fields())
    }
}
