//! # cairn-wal
//!
//! Write-ahead logging for Cairn.
//!
//! This crate provides:
//! - A compact, checksummed record format for insert / update / delete
//! - Segment files with torn-tail detection, plus an in-memory log
//! - The [`WalWriter`]: a single writer thread that assigns commit sequence
//!   numbers in queue order, group-commits batches, and can be paused and
//!   resumed from outside
//!
//! # Architecture
//!
//! The on-disk log is organized into segments (default 64 MB each). Each
//! segment starts with a small preamble and then holds a run of records.
//!
//! ## Record Format
//!
//! Each record consists of a 24-byte header followed by a variable-length payload:
//!
//! ```text
//! +---------+-------------+------+-------+----------+--------+----------+
//! | Seq (8) | SpaceId (4) | Type | Flags | Reserved | Length | Checksum |
//! +---------+-------------+------+-------+----------+--------+----------+
//! |                         Payload (variable)                          |
//! +---------------------------------------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;

/// WAL record types and serialization.
pub mod record;

/// WAL segment management.
pub mod segment;

/// WAL reader for recovery.
pub mod reader;

/// Log store implementations.
pub mod store;

/// The WAL writer thread.
pub mod writer;

// Re-exports for convenience
pub use config::{SyncPolicy, WalConfig};
pub use error::{WalError, WalResult};
pub use record::{
    AbortPayload, DeletePayload, InsertPayload, RecordFlags, RecordHeader, RecordType,
    UpdatePayload, WalPayload, WalRecord,
};
pub use store::{LogStore, MemoryLog, SegmentedLog};
pub use writer::{WalWriter, WriterState, WriterStats};
