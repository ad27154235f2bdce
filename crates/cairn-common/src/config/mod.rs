//! Configuration for Cairn.
//!
//! This module provides the object space schema definitions consumed by
//! the storage engine. Server and WAL settings live in their own crates.

mod schema;

pub use schema::{IndexConfig, IndexKind, KeyFieldConfig, SpaceConfig};
