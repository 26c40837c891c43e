//! Store client trait

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::types::{Get, RawRow, Scan};
use crate::Result;

/// Lazy, finite sequence of scanned rows. Not restartable once partially consumed.
pub type RowStream = BoxStream<'static, Result<RawRow>>;

/// Client for a wide-column store.
///
/// Implementations own connection management and routing. Failures are
/// reported as [`crate::StoreError`] and callers propagate them unchanged.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Read one row. `Ok(None)` when the row is absent or no cell survives the predicate.
    async fn get(&self, get: &Get) -> Result<Option<RawRow>>;

    /// Open a row-prefix scan. Rows arrive in key order.
    async fn scan(&self, scan: &Scan) -> Result<RowStream>;
}

#[async_trait]
impl<T: StoreClient + ?Sized> StoreClient for Arc<T> {
    async fn get(&self, get: &Get) -> Result<Option<RawRow>> {
        (**self).get(get).await
    }

    async fn scan(&self, scan: &Scan) -> Result<RowStream> {
        (**self).scan(scan).await
    }
}
