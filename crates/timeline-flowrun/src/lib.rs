//! # Timeline Flow Run Reader
//!
//! Query adapter between timeline readers and the flow run table of a
//! wide-column store:
//!
//! - **Row keys** - prefix-addressable `cluster!user!flow!run` keys
//! - **Filter builder** - time range, metric value and column selection
//!   predicates in the store's pushdown language
//! - **Result parser** - rebuilds a flow run from filtered, multi-version cells,
//!   merging metric versions with the column prefix's aggregator
//!
//! ## Example
//! ```rust,ignore
//! use timeline_flowrun::FlowRunReader;
//!
//! let reader = FlowRunReader::new(store, ReaderConfig::from_env()?);
//! let run = reader
//!     .read_entity(&QueryContext::new("c1", "u1", "f1").with_run(42), &FieldSelector::default())
//!     .await?;
//! ```

pub mod filter;
pub mod parser;
pub mod query;
pub mod reader;
pub mod row_key;
pub mod schema;
pub mod selection;
pub mod separator;

pub use filter::{build_field_selection_filter, build_time_and_metric_filter};
pub use parser::FlowRunParser;
pub use query::{resolve_read_target, validate_context, FlowRunQuery, ReadTarget};
pub use reader::FlowRunReader;
pub use row_key::FlowRunRowKey;
pub use schema::{ColumnPrefix, FlowRunColumn, FlowRunSchema};
pub use selection::{select_branch, FieldBranch};
pub use timeline_store::{Aggregator, LastWriteWins, Max, Min, Sum};
