//! In-process store
//!
//! Holds tables in memory and evaluates predicates the way a region server
//! would: version policy first, then the predicate per cell, then the page
//! limit over surviving rows.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::client::{RowStream, StoreClient};
use crate::predicate::Predicate;
use crate::types::{Cell, Get, RawRow, Scan, VersionPolicy};
use crate::{Result, StoreError};

type Table = BTreeMap<Bytes, Vec<Cell>>;

#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<HashMap<String, Table>>,
    failure: Mutex<Option<StoreError>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one cell version, creating the table on first use.
    pub fn put(&self, table: &str, row: impl Into<Bytes>, cell: Cell) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .entry(row.into())
            .or_default()
            .push(cell);
    }

    /// Make the next `get` or `scan` fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        *self.failure.lock() = Some(err);
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_row(
        key: &Bytes,
        cells: &[Cell],
        versions: VersionPolicy,
        predicate: Option<&Predicate>,
    ) -> Option<RawRow> {
        let row = RawRow::new(key.clone(), Self::select_versions(cells, versions));
        let row = match predicate {
            Some(p) => p.apply(&row),
            None => row,
        };
        (!row.is_empty()).then_some(row)
    }

    fn select_versions(cells: &[Cell], versions: VersionPolicy) -> Vec<Cell> {
        let mut columns: BTreeMap<(&[u8], &[u8]), Vec<&Cell>> = BTreeMap::new();
        for cell in cells {
            columns
                .entry((&cell.family[..], &cell.qualifier[..]))
                .or_default()
                .push(cell);
        }

        let mut selected = Vec::with_capacity(cells.len());
        for (_, mut column) in columns {
            column.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            if let Some(limit) = versions.limit() {
                column.truncate(limit);
            }
            selected.extend(column.into_iter().cloned());
        }
        selected
    }
}

#[async_trait]
impl StoreClient for MemStore {
    #[instrument(skip(self, get), fields(table = %get.table))]
    async fn get(&self, get: &Get) -> Result<Option<RawRow>> {
        self.check_failure()?;

        let tables = self.tables.read();
        let table = tables
            .get(&get.table)
            .ok_or_else(|| StoreError::TableNotFound(get.table.clone()))?;

        Ok(table.get(&get.row).and_then(|cells| {
            Self::read_row(&get.row, cells, get.versions, get.predicate.as_ref())
        }))
    }

    #[instrument(skip(self, scan), fields(table = %scan.table))]
    async fn scan(&self, scan: &Scan) -> Result<RowStream> {
        self.check_failure()?;

        let cap = scan.row_cap().map(|n| n as usize);
        let tables = self.tables.read();
        let table = tables
            .get(&scan.table)
            .ok_or_else(|| StoreError::TableNotFound(scan.table.clone()))?;

        let mut rows = Vec::new();
        for (key, cells) in table.range(scan.prefix.clone()..) {
            if !key.starts_with(&scan.prefix) || cap.map_or(false, |cap| rows.len() >= cap) {
                break;
            }
            if let Some(row) = Self::read_row(key, cells, scan.versions, scan.predicate.as_ref()) {
                rows.push(row);
            }
        }

        debug!(rows = rows.len(), cap = ?cap, "Scan materialized");
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}
