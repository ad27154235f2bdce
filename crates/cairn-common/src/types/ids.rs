//! Identifier types for Cairn.
//!
//! Newtype wrappers keep commit sequence numbers and space identifiers
//! from being mixed up with plain integers.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SpaceId
// =============================================================================

/// Object space identifier.
///
/// Spaces are numbered by configuration; the number is carried in every
/// WAL record so recovery can route a record back to its space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SpaceId(u32);

impl SpaceId {
    /// Creates a new `SpaceId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpaceId({})", self.0)
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SpaceId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl From<SpaceId> for u32 {
    #[inline]
    fn from(id: SpaceId) -> Self {
        id.0
    }
}

// =============================================================================
// CommitSeq
// =============================================================================

/// Commit sequence number.
///
/// Assigned by the WAL writer when a record is accepted into its queue.
/// Sequence numbers are strictly increasing, and logged mutations become
/// visible in exactly this order.
///
/// # Example
///
/// ```rust
/// use cairn_common::types::CommitSeq;
///
/// let seq = CommitSeq::FIRST;
/// assert!(seq.is_valid());
/// assert_eq!(seq.next(), CommitSeq::new(2));
/// assert!(seq > CommitSeq::INVALID);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct CommitSeq(u64);

impl CommitSeq {
    /// Invalid sequence, used as "nothing committed yet".
    pub const INVALID: Self = Self(0);

    /// First sequence handed out by a fresh log.
    pub const FIRST: Self = Self(1);

    /// Creates a new `CommitSeq` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true if this is a valid sequence.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Returns the sequence that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the sequence that precedes this one, saturating at `INVALID`.
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Returns the sequence as bytes (little-endian).
    #[inline]
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Creates a sequence from bytes (little-endian).
    #[inline]
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl Default for CommitSeq {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for CommitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "CommitSeq(INVALID)")
        } else {
            write!(f, "CommitSeq({})", self.0)
        }
    }
}

impl fmt::Display for CommitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for CommitSeq {
    #[inline]
    fn from(seq: u64) -> Self {
        Self::new(seq)
    }
}

impl From<CommitSeq> for u64 {
    #[inline]
    fn from(seq: CommitSeq) -> Self {
        seq.0
    }
}
