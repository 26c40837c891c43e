//! Server-side pushdown predicates
//!
//! A predicate is a tree of atomic comparators combined by AND and OR groups.
//! Evaluation is per cell: a cell is returned when the tree admits it. Group
//! evaluation short-circuits in child order (AND stops at the first child that
//! rejects, OR at the first that admits). An empty group admits everything.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::aggregate::{fold_versions, Aggregator};
use crate::types::{Cell, RawRow};

/// Comparison operator shared by every atomic comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

impl CompareOp {
    /// Whether `ordering`, the stored value compared with the operand, satisfies the operator.
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::Greater => ordering == Ordering::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
        }
    }
}

/// Comparator over family or qualifier bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteComparator {
    /// Whole-value lexicographic comparison
    Binary(Bytes),
    /// Compares only the first `prefix.len()` bytes, so `Equal` means "starts with"
    Prefix(Bytes),
}

impl ByteComparator {
    pub fn compare(&self, actual: &[u8]) -> Ordering {
        match self {
            Self::Binary(expected) => actual.cmp(&expected[..]),
            Self::Prefix(prefix) => {
                let n = prefix.len().min(actual.len());
                actual[..n].cmp(&prefix[..])
            }
        }
    }
}

/// Comparator over a cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueComparator {
    /// Value decoded as a big-endian signed 64-bit integer
    Long(i64),
    Binary(Bytes),
}

impl ValueComparator {
    /// `None` when the stored value cannot be decoded for this comparator.
    pub fn compare(&self, actual: &[u8]) -> Option<Ordering> {
        match self {
            Self::Long(expected) => {
                let raw: [u8; 8] = actual.try_into().ok()?;
                Some(i64::from_be_bytes(raw).cmp(expected))
            }
            Self::Binary(expected) => Some(actual.cmp(&expected[..])),
        }
    }
}

/// Folds every version of a column before a value comparison.
/// Two folds are equal when their aggregators share a name.
#[derive(Debug, Clone)]
pub struct VersionFold(Arc<dyn Aggregator>);

impl VersionFold {
    pub fn new(aggregator: Arc<dyn Aggregator>) -> Self {
        Self(aggregator)
    }

    pub fn aggregator(&self) -> &dyn Aggregator {
        self.0.as_ref()
    }

    /// Merged value of the column's versions that decode as longs.
    fn value(&self, versions: &[&Cell]) -> Option<i64> {
        let decoded = versions.iter().filter_map(|cell| {
            <[u8; 8]>::try_from(&cell.value[..])
                .ok()
                .map(|raw| (cell.timestamp, i64::from_be_bytes(raw)))
        });
        fold_versions(self.aggregator(), decoded).map(|merged| merged.value)
    }
}

impl PartialEq for VersionFold {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name()
    }
}

impl Eq for VersionFold {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column family comparison
    Family { op: CompareOp, family: Bytes },
    /// Qualifier comparison
    Qualifier { op: CompareOp, comparator: ByteComparator },
    /// Row-level test on one column. Compares the latest version, or with a
    /// `fold` and a long comparator, the fold of all versions. Rows lacking
    /// the column pass unless `filter_if_missing` is set.
    ColumnValue {
        family: Bytes,
        qualifier: Bytes,
        op: CompareOp,
        comparator: ValueComparator,
        filter_if_missing: bool,
        fold: Option<VersionFold>,
    },
    /// Caps the number of rows a scan returns
    PageLimit(u64),
    /// AND group
    All(Vec<Predicate>),
    /// OR group
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Empty AND group
    pub fn all() -> Self {
        Self::All(Vec::new())
    }

    /// Empty OR group
    pub fn any() -> Self {
        Self::Any(Vec::new())
    }

    pub fn family(family: impl Into<Bytes>) -> Self {
        Self::Family {
            op: CompareOp::Equal,
            family: family.into(),
        }
    }

    pub fn qualifier(qualifier: impl Into<Bytes>) -> Self {
        Self::Qualifier {
            op: CompareOp::Equal,
            comparator: ByteComparator::Binary(qualifier.into()),
        }
    }

    pub fn qualifier_prefix(op: CompareOp, prefix: impl Into<Bytes>) -> Self {
        Self::Qualifier {
            op,
            comparator: ByteComparator::Prefix(prefix.into()),
        }
    }

    /// Add a child to a group. An atom becomes the first child of a new AND group.
    pub fn push(&mut self, child: Predicate) {
        match self {
            Self::All(children) | Self::Any(children) => children.push(child),
            atom => {
                let first = std::mem::replace(atom, Self::all());
                *atom = Self::All(vec![first, child]);
            }
        }
    }

    pub fn with(mut self, child: Predicate) -> Self {
        self.push(child);
        self
    }

    /// True for a group with no children, which admits everything.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::All(c) | Self::Any(c) if c.is_empty())
    }

    /// Smallest page limit reachable through AND groups from the root.
    pub fn page_limit(&self) -> Option<u64> {
        match self {
            Self::PageLimit(n) => Some(*n),
            Self::All(children) => children.iter().filter_map(Self::page_limit).min(),
            _ => None,
        }
    }

    /// Whether `cell` of `row` passes. `row` must be the full row the cell belongs to.
    pub fn admits(&self, row: &RawRow, cell: &Cell) -> bool {
        match self {
            Self::Family { op, family } => op.matches(cell.family[..].cmp(&family[..])),
            Self::Qualifier { op, comparator } => op.matches(comparator.compare(&cell.qualifier)),
            Self::ColumnValue {
                family,
                qualifier,
                op,
                comparator,
                filter_if_missing,
                fold,
            } => {
                let versions = row.versions(family, qualifier);
                let Some(latest) = versions.first() else {
                    return !filter_if_missing;
                };
                let ordering = match (fold, comparator) {
                    (Some(fold), ValueComparator::Long(expected)) => {
                        fold.value(&versions).map(|merged| merged.cmp(expected))
                    }
                    _ => comparator.compare(&latest.value),
                };
                ordering.map_or(false, |ordering| op.matches(ordering))
            }
            Self::PageLimit(_) => true,
            Self::All(children) => children.iter().all(|c| c.admits(row, cell)),
            Self::Any(children) => children.is_empty() || children.iter().any(|c| c.admits(row, cell)),
        }
    }

    /// The subset of `row` this predicate admits.
    pub fn apply(&self, row: &RawRow) -> RawRow {
        let cells = row
            .cells
            .iter()
            .filter(|cell| self.admits(row, cell))
            .cloned()
            .collect();
        RawRow::new(row.key.clone(), cells)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Family { op, family } => {
                write!(f, "family {} {:?}", op.symbol(), String::from_utf8_lossy(family))
            }
            Self::Qualifier { op, comparator } => match comparator {
                ByteComparator::Binary(q) => {
                    write!(f, "qualifier {} {:?}", op.symbol(), String::from_utf8_lossy(q))
                }
                ByteComparator::Prefix(p) => write!(
                    f,
                    "qualifier prefix {} {:?}",
                    op.symbol(),
                    String::from_utf8_lossy(p)
                ),
            },
            Self::ColumnValue {
                qualifier,
                op,
                comparator,
                fold,
                ..
            } => {
                let operand = match comparator {
                    ValueComparator::Long(v) => v.to_string(),
                    ValueComparator::Binary(b) => format!("{:?}", String::from_utf8_lossy(b)),
                };
                let function = fold.as_ref().map_or("value", |f| f.aggregator().name());
                write!(
                    f,
                    "{}({}) {} {}",
                    function,
                    String::from_utf8_lossy(qualifier),
                    op.symbol(),
                    operand
                )
            }
            Self::PageLimit(n) => write!(f, "page({})", n),
            Self::All(children) | Self::Any(children) => {
                let name = if matches!(self, Self::All(_)) { "AND" } else { "OR" };
                write!(f, "{}(", name)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
