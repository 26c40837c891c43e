//! Cells, rows and read requests

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

/// One stored version of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub family: Bytes,
    pub qualifier: Bytes,
    pub timestamp: i64,
    pub value: Bytes,
}

impl Cell {
    pub fn new(
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        timestamp: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            value: value.into(),
        }
    }

    pub fn is_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        &self.family[..] == family && &self.qualifier[..] == qualifier
    }
}

/// A row as returned by a Get or Scan: its key and every cell version that
/// survived the request's predicate and version policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub key: Bytes,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn new(key: impl Into<Bytes>, cells: Vec<Cell>) -> Self {
        Self {
            key: key.into(),
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Versions of one column, newest first.
    pub fn versions(&self, family: &[u8], qualifier: &[u8]) -> Vec<&Cell> {
        let mut versions: Vec<&Cell> = self
            .cells
            .iter()
            .filter(|c| c.is_column(family, qualifier))
            .collect();
        versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        versions
    }

    pub fn latest(&self, family: &[u8], qualifier: &[u8]) -> Option<&Cell> {
        self.cells
            .iter()
            .filter(|c| c.is_column(family, qualifier))
            .max_by_key(|c| c.timestamp)
    }

    /// Cells of `family` whose qualifier starts with `prefix`, in stored order.
    pub fn with_qualifier_prefix<'a>(
        &'a self,
        family: &'a [u8],
        prefix: &'a [u8],
    ) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells
            .iter()
            .filter(move |c| &c.family[..] == family && c.qualifier.starts_with(prefix))
    }
}

/// How many versions of each column a read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    Latest,
    All,
}

impl VersionPolicy {
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Latest => Some(1),
            Self::All => None,
        }
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self::Latest
    }
}

/// Exact-key read
#[derive(Debug, Clone)]
pub struct Get {
    pub table: String,
    pub row: Bytes,
    pub predicate: Option<Predicate>,
    pub versions: VersionPolicy,
}

impl Get {
    pub fn new(table: impl Into<String>, row: impl Into<Bytes>) -> Self {
        Self {
            table: table.into(),
            row: row.into(),
            predicate: None,
            versions: VersionPolicy::default(),
        }
    }

    /// Attach a predicate. Empty groups are dropped so they never reach the wire.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = (!predicate.is_empty()).then_some(predicate);
        self
    }

    pub fn with_versions(mut self, versions: VersionPolicy) -> Self {
        self.versions = versions;
        self
    }
}

/// Row-prefix bounded range read
#[derive(Debug, Clone)]
pub struct Scan {
    pub table: String,
    pub prefix: Bytes,
    pub predicate: Option<Predicate>,
    pub versions: VersionPolicy,
}

impl Scan {
    pub fn new(table: impl Into<String>, prefix: impl Into<Bytes>) -> Self {
        Self {
            table: table.into(),
            prefix: prefix.into(),
            predicate: None,
            versions: VersionPolicy::default(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = (!predicate.is_empty()).then_some(predicate);
        self
    }

    pub fn with_versions(mut self, versions: VersionPolicy) -> Self {
        self.versions = versions;
        self
    }

    /// Row cap carried by a page-limit predicate, if any.
    pub fn row_cap(&self) -> Option<u64> {
        self.predicate.as_ref().and_then(Predicate::page_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RawRow {
        RawRow::new(
            "r1",
            vec![
                Cell::new("i", "m!a", 10, vec![1]),
                Cell::new("i", "m!a", 30, vec![3]),
                Cell::new("i", "m!a", 20, vec![2]),
                Cell::new("i", "flow_version", 5, "v1"),
            ],
        )
    }

    #[test]
    fn test_versions_newest_first() {
        let row = row();
        let ts: Vec<i64> = row.versions(b"i", b"m!a").iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![30, 20, 10]);
        assert_eq!(row.latest(b"i", b"m!a").map(|c| c.timestamp), Some(30));
        assert!(row.latest(b"i", b"missing").is_none());
    }

    #[test]
    fn test_qualifier_prefix() {
        let row = row();
        assert_eq!(row.with_qualifier_prefix(b"i", b"m!").count(), 3);
        assert_eq!(row.with_qualifier_prefix(b"x", b"m!").count(), 0);
    }

    #[test]
    fn test_empty_predicate_is_not_attached() {
        let get = Get::new("t", "r").with_predicate(Predicate::all());
        assert!(get.predicate.is_none());

        let scan = Scan::new("t", "p").with_predicate(Predicate::All(vec![Predicate::PageLimit(5)]));
        assert_eq!(scan.row_cap(), Some(5));
    }
}
