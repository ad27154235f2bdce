//! Type definitions for Cairn.
//!
//! This module contains the core value types shared by the WAL, the
//! storage engine and the server.

mod field;
mod ids;
mod ops;
mod tuple;

pub use field::{Field, FieldType};
pub use ids::{CommitSeq, SpaceId};
pub use ops::{InsertMode, UpdateOp};
pub use tuple::Tuple;
