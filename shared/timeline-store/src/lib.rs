//! Timeline Store
//!
//! Vocabulary for reading a wide-column (sparse, versioned, column-family) store:
//! cells and rows, Get/Scan requests, the pushdown predicate tree, version
//! aggregators, and the async client trait readers call. `MemStore` is an
//! in-process implementation.

mod aggregate;
mod client;
mod error;
mod memstore;
mod predicate;
mod types;

pub use aggregate::{fold_versions, AggregatedValue, Aggregator, LastWriteWins, Max, Min, Sum};
pub use client::{RowStream, StoreClient};
pub use error::{Result, StoreError};
pub use memstore::MemStore;
pub use predicate::{ByteComparator, CompareOp, Predicate, ValueComparator, VersionFold};
pub use types::*;

/// Re-export for convenience
pub use bytes::Bytes;
