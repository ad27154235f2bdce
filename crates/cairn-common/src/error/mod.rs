//! Error handling for Cairn.
//!
//! This module provides a unified error type and result alias used
//! across all Cairn components, plus the stable [`ErrorCode`] registry
//! that crate-specific errors map onto.

mod database;

pub use database::{CairnError, ErrorCode};

/// Result type alias for Cairn operations.
pub type CairnResult<T> = std::result::Result<T, CairnError>;
