//! # cairn-common
//!
//! Common types, errors, and utilities for Cairn.
//!
//! This crate provides the foundational types shared by every Cairn
//! component:
//!
//! - **Types**: identifiers (`SpaceId`, `CommitSeq`), typed fields and tuples
//! - **Errors**: unified error handling with `CairnError` and stable `ErrorCode`s
//! - **Config**: object space and index definitions as loaded from config files
//! - **Constants**: system-wide limits
//!
//! ## Example
//!
//! ```rust
//! use cairn_common::types::{Field, Tuple};
//!
//! let tuple = Tuple::new(vec![Field::num(3), Field::str("baz")]);
//! assert_eq!(tuple.len(), 2);
//! assert_eq!(tuple.to_string(), r#"[3, "baz"]"#);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{CairnError, CairnResult, ErrorCode};
pub use types::{CommitSeq, Field, FieldType, InsertMode, SpaceId, Tuple, UpdateOp};
