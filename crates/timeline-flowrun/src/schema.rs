//! Flow run table schema
//!
//! Every column lives in the info family. Fixed columns have well-known
//! qualifiers; metrics live under the `m!` qualifier prefix, one qualifier per
//! metric id, one version per reported data point.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use timeline_store::{Aggregator, Max, Min, Sum, VersionFold};

use crate::separator;

pub const INFO_FAMILY: &[u8] = b"i";

pub const METRIC_PREFIX: &str = "m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowRunColumn {
    MinStartTime,
    MaxEndTime,
    FlowVersion,
}

impl FlowRunColumn {
    pub const ALL: [FlowRunColumn; 3] = [Self::MinStartTime, Self::MaxEndTime, Self::FlowVersion];

    pub fn qualifier(self) -> &'static [u8] {
        match self {
            Self::MinStartTime => b"min_start_time",
            Self::MaxEndTime => b"max_end_time",
            Self::FlowVersion => b"flow_version",
        }
    }

    /// Merge across versions; `None` means only the newest version counts.
    pub fn aggregator(self) -> Option<&'static dyn Aggregator> {
        match self {
            Self::MinStartTime => Some(&Min),
            Self::MaxEndTime => Some(&Max),
            Self::FlowVersion => None,
        }
    }

    /// Fold for value predicates on this column, matching what the parser reports.
    pub fn fold(self) -> Option<VersionFold> {
        match self {
            Self::MinStartTime => Some(VersionFold::new(Arc::new(Min))),
            Self::MaxEndTime => Some(VersionFold::new(Arc::new(Max))),
            Self::FlowVersion => None,
        }
    }
}

/// A family of dynamically named columns sharing one qualifier prefix
#[derive(Debug, Clone)]
pub struct ColumnPrefix {
    prefix: Bytes,
    aggregator: Arc<dyn Aggregator>,
}

impl ColumnPrefix {
    pub fn new(name: &str, aggregator: Arc<dyn Aggregator>) -> Self {
        let mut buf = BytesMut::new();
        separator::join_terminated(&mut buf, &[name]);
        Self {
            prefix: buf.freeze(),
            aggregator,
        }
    }

    /// Qualifier bytes shared by every column under this prefix.
    pub fn prefix_bytes(&self) -> Bytes {
        self.prefix.clone()
    }

    /// Qualifier for one column id. For a partial id this is also a valid
    /// qualifier prefix, since escaping works character by character.
    pub fn qualifier(&self, id: &str) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.prefix.len() + id.len());
        buf.put_slice(&self.prefix);
        buf.put_slice(&separator::encode(id));
        buf.freeze()
    }

    /// Column id of a qualifier under this prefix; `None` for other qualifiers
    /// or undecodable ids.
    pub fn column_id(&self, qualifier: &[u8]) -> Option<String> {
        qualifier
            .strip_prefix(&self.prefix[..])
            .and_then(separator::decode)
    }

    pub fn aggregator(&self) -> &dyn Aggregator {
        self.aggregator.as_ref()
    }

    pub fn fold(&self) -> VersionFold {
        VersionFold::new(self.aggregator.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FlowRunSchema {
    pub info_family: Bytes,
    pub metric: ColumnPrefix,
}

impl Default for FlowRunSchema {
    fn default() -> Self {
        Self::with_metric_aggregator(Arc::new(Sum))
    }
}

impl FlowRunSchema {
    pub fn with_metric_aggregator(aggregator: Arc<dyn Aggregator>) -> Self {
        Self {
            info_family: Bytes::from_static(INFO_FAMILY),
            metric: ColumnPrefix::new(METRIC_PREFIX, aggregator),
        }
    }
}

pub fn encode_long(value: i64) -> Bytes {
    Bytes::copy_from_slice(&value.to_be_bytes())
}

pub fn decode_long(raw: &[u8]) -> Option<i64> {
    <[u8; 8]>::try_from(raw).ok().map(i64::from_be_bytes)
}
