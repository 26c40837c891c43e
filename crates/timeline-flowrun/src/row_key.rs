//! Flow run row keys
//!
//! Layout: `cluster ! user ! flow ! run` where the three names are escaped
//! with [`crate::separator`] and the run id is stored inverted
//! (`i64::MAX - run`) as 8 big-endian bytes, so newer runs sort first.
//! The first three terminated components form the scan prefix for every run
//! of one flow; a different flow name can never extend that prefix.

use bytes::{BufMut, Bytes, BytesMut};
use timeline_core::{Result, TimelineError};

use crate::separator;

const RUN_ID_LEN: usize = 8;
const PREFIX_COMPONENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowRunRowKey {
    pub cluster_id: String,
    pub user_id: String,
    pub flow_name: String,
    pub flow_run_id: i64,
}

impl FlowRunRowKey {
    pub fn new(
        cluster_id: impl Into<String>,
        user_id: impl Into<String>,
        flow_name: impl Into<String>,
        flow_run_id: i64,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            user_id: user_id.into(),
            flow_name: flow_name.into(),
            flow_run_id,
        }
    }

    /// Scan bound covering every run of one flow.
    pub fn prefix(cluster_id: &str, user_id: &str, flow_name: &str) -> Bytes {
        let mut buf = BytesMut::new();
        separator::join_terminated(&mut buf, &[cluster_id, user_id, flow_name]);
        buf.freeze()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        separator::join_terminated(
            &mut buf,
            &[
                self.cluster_id.as_str(),
                self.user_id.as_str(),
                self.flow_name.as_str(),
            ],
        );
        buf.put_i64(invert(self.flow_run_id));
        buf.freeze()
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        let (components, rest) = separator::split_terminated(raw, PREFIX_COMPONENTS);
        if components.len() < PREFIX_COMPONENTS {
            return Err(TimelineError::MalformedRow(format!(
                "flow run key has {} of {} name components: {:?}",
                components.len(),
                PREFIX_COMPONENTS,
                String::from_utf8_lossy(raw)
            )));
        }

        let run: [u8; RUN_ID_LEN] = rest.try_into().map_err(|_| {
            TimelineError::MalformedRow(format!(
                "flow run key suffix is {} bytes, expected {}",
                rest.len(),
                RUN_ID_LEN
            ))
        })?;

        let name = |i: usize| {
            separator::decode(components[i]).ok_or_else(|| {
                TimelineError::MalformedRow(format!(
                    "undecodable key component {:?}",
                    String::from_utf8_lossy(components[i])
                ))
            })
        };

        Ok(Self {
            cluster_id: name(0)?,
            user_id: name(1)?,
            flow_name: name(2)?,
            flow_run_id: invert(i64::from_be_bytes(run)),
        })
    }
}

/// Self-inverse; wrapping keeps negative run ids decodable.
fn invert(run_id: i64) -> i64 {
    i64::MAX.wrapping_sub(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for key in [
            FlowRunRowKey::new("c1", "u1", "f1", 42),
            FlowRunRowKey::new("yarn-cluster", "alice", "word count!", 1_466_000_000_000),
            FlowRunRowKey::new("c%1", "u!", "%21", 0),
            FlowRunRowKey::new("c", "u", "f", -5),
            FlowRunRowKey::new("c", "u", "f", i64::MAX),
        ] {
            let encoded = key.encode();
            assert_eq!(FlowRunRowKey::decode(&encoded).unwrap(), key);
            assert!(encoded.starts_with(&FlowRunRowKey::prefix(
                &key.cluster_id,
                &key.user_id,
                &key.flow_name
            )));
        }
    }

    #[test]
    fn test_run_id_bytes_may_contain_separator() {
        // 0x21 in the inverted run id must not confuse the name split.
        let key = FlowRunRowKey::new("c", "u", "f", i64::MAX - 0x21);
        assert_eq!(FlowRunRowKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn test_prefix_does_not_cross_flows() {
        let prefix = FlowRunRowKey::prefix("c1", "u1", "f1");
        let other = FlowRunRowKey::new("c1", "u1", "f10", 1).encode();
        assert!(!other.starts_with(&prefix));

        let escaped = FlowRunRowKey::new("c1", "u1", "f1!x", 1).encode();
        assert!(!escaped.starts_with(&prefix));
    }

    #[test]
    fn test_newer_runs_sort_first() {
        let older = FlowRunRowKey::new("c", "u", "f", 100).encode();
        let newer = FlowRunRowKey::new("c", "u", "f", 200).encode();
        assert!(newer < older);
    }

    #[test]
    fn test_distinct_tuples_do_not_collide() {
        let a = FlowRunRowKey::new("a!b", "c", "d", 1).encode();
        let b = FlowRunRowKey::new("a", "b!c", "d", 1).encode();
        assert_ne!(a, b);
    }

    #[test]
    fn test_too_few_components() {
        let err = FlowRunRowKey::decode(b"c1!u1").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedRow(_)));
        assert!(err.to_string().contains("1 of 3"));

        let err = FlowRunRowKey::decode(b"c1!u1!").unwrap_err();
        assert!(err.to_string().contains("2 of 3"));
    }

    #[test]
    fn test_bad_suffix_length() {
        let mut raw = FlowRunRowKey::prefix("c", "u", "f").to_vec();
        raw.extend_from_slice(&[0, 1, 2]);
        assert!(matches!(
            FlowRunRowKey::decode(&raw),
            Err(TimelineError::MalformedRow(_))
        ));
    }
}
