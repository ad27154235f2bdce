//! # cairn-server
//!
//! The Cairn database facade. It owns the object spaces and the WAL writer
//! and routes every mutation through one of two paths:
//!
//! - **Logged**: validated against the current index state, appended to the
//!   WAL, and applied only after the record is durable, strictly in commit
//!   order. While the writer is stalled these calls block.
//! - **Unlogged**: validated and applied immediately, never touching the
//!   WAL. These calls proceed while the writer is stalled.
//!
//! Reads never wait for the writer.
//!
//! # Quick Start
//!
//! ```
//! use cairn_common::config::{IndexConfig, SpaceConfig};
//! use cairn_common::types::{Field, FieldType, SpaceId};
//! use cairn_common::tuple;
//! use cairn_server::Database;
//!
//! let db = Database::open_memory(&[SpaceConfig::new(0, IndexConfig::hash(0, FieldType::Num))]).unwrap();
//! let space = SpaceId::new(0);
//! db.insert(space, tuple![1u64, "foo"]).unwrap();
//! assert!(db.get(space, &[Field::num(1)]).unwrap().is_some());
//! db.close();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Server configuration.
pub mod config;

/// Database engine - the main entry point for Cairn.
pub mod database;

pub use config::{ServerConfig, ServerConfigBuilder, WalSection, WalSyncMode};
pub use database::{Database, DatabaseError, DatabaseResult, DatabaseStats, RecoveryStats};
