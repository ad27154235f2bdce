//! # Cairn Database Engine
//!
//! This module provides the `Database` facade that wires the object spaces
//! (`cairn-storage`) to the WAL writer (`cairn-wal`):
//!
//! ```text
//!   logged call ──► check ──► WalWriter::submit ──► ApplySequencer ──► apply
//!                              (blocks while            (commit order)
//!                               stalled)
//!
//!   unlogged call ─► check ──────────────────────────────────────────► apply
//!
//!   read ──────────────────────────────────────────────► ObjectSpace (RwLock)
//! ```
//!
//! Every apply re-checks conflicts against the index state at that moment,
//! so an unlogged write that lands while a logged one is queued turns the
//! logged one into a conflict rather than a duplicate.

mod engine;
mod error;
mod mutation;
mod recovery;
mod sequencer;

pub use engine::{Database, DatabaseStats};
pub use error::{DatabaseError, DatabaseResult};
pub use recovery::RecoveryStats;
