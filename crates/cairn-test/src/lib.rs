//! # cairn-test
//!
//! Integration tests for Cairn.
//!
//! This crate contains:
//! - Writer stall scenarios across the logged and unlogged paths
//! - Iterator ordering checks
//! - Recovery from segment files

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;
