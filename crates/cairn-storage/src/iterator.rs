//! Directional iteration over an ordered index.
//!
//! An iterator snapshots its result window when opened: later mutations of
//! the space are not observed, and tuples it has yielded stay valid after
//! they are deleted or replaced.
//!
//! The snapshot holds one `Arc<Tuple>` per tuple in the window, so memory
//! and open time grow with `limit` (or with the index size when unlimited).

use std::fmt;
use std::sync::Arc;

use cairn_common::types::{Field, Tuple};

/// Direction of iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending key order.
    #[default]
    Forward,
    /// Descending key order.
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

/// Parameters of an index scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IteratorOptions {
    /// Index to scan.
    pub index: usize,
    /// Start key, possibly partial. Empty means the first entry in the
    /// iteration direction.
    pub start_key: Vec<Field>,
    /// Iteration direction.
    pub direction: Direction,
    /// Number of matching tuples to skip.
    pub offset: usize,
    /// Maximum number of tuples to return.
    pub limit: Option<usize>,
}

impl IteratorOptions {
    /// Scans index `index` forward from its first entry.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Sets the start key.
    pub fn with_start_key(mut self, key: Vec<Field>) -> Self {
        self.start_key = key;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Iterator over a snapshot of tuples. `None` marks the end.
pub struct TupleIterator {
    tuples: std::vec::IntoIter<Arc<Tuple>>,
    direction: Direction,
}

impl TupleIterator {
    pub(crate) fn new(tuples: Vec<Arc<Tuple>>, direction: Direction) -> Self {
        Self {
            tuples: tuples.into_iter(),
            direction,
        }
    }

    /// Returns the iteration direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Iterator for TupleIterator {
    type Item = Arc<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tuples.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tuples.size_hint()
    }
}

impl ExactSizeIterator for TupleIterator {}

impl fmt::Debug for TupleIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleIterator")
            .field("direction", &self.direction)
            .field("remaining", &self.tuples.len())
            .finish()
    }
}
