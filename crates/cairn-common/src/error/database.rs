//! Database error types.
//!
//! Every crate-level error in Cairn maps onto an [`ErrorCode`], so callers
//! (and the load generator's histogram) can classify failures without
//! matching on each crate's enum.

use std::fmt;
use thiserror::Error;

use crate::types::CommitSeq;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug), such as a panicked worker thread.
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Storage errors (0x0200 - 0x02FF)
    /// Object space not found.
    SpaceNotFound = 0x0200,
    /// Index not found in object space.
    IndexNotFound = 0x0201,
    /// Key not found.
    KeyNotFound = 0x0202,
    /// Key already exists in a unique index.
    KeyExists = 0x0203,

    // Tuple errors (0x0300 - 0x03FF)
    /// Tuple does not match the space definition.
    MalformedTuple = 0x0300,
    /// Field has the wrong type.
    TypeMismatch = 0x0301,
    /// Required field is missing.
    FieldMissing = 0x0302,
    /// Update operation cannot be applied.
    IllegalUpdate = 0x0303,

    // WAL errors (0x0400 - 0x04FF)
    /// WAL is corrupted.
    WalCorrupted = 0x0400,
    /// WAL write failed.
    WalWriteFailed = 0x0401,
    /// WAL writer is shut down.
    WalClosed = 0x0402,

    // Configuration errors (0x0500 - 0x05FF)
    /// Invalid configuration.
    InvalidConfig = 0x0500,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Tuple",
            0x04 => "WAL",
            0x05 => "Config",
            _ => "Unknown",
        }
    }

    /// Returns true if a client may retry the request unchanged.
    ///
    /// Only transient WAL write failures qualify. Key conflicts and misses
    /// depend on data and will repeat until another writer changes it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::WalWriteFailed)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for Cairn.
///
/// Returned directly by schema validation, and the common vocabulary
/// that WAL errors convert into. Storage and server errors carry their
/// own enums and map onto [`ErrorCode`] through `code()`.
#[derive(Debug, Error)]
pub enum CairnError {
    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // WAL Errors
    // ==========================================================================
    /// WAL is corrupted.
    #[error("WAL corrupted at {seq}: {reason}")]
    WalCorrupted {
        /// The commit sequence where corruption was detected.
        seq: CommitSeq,
        /// Reason for corruption.
        reason: String,
    },

    /// WAL write failed.
    #[error("WAL write failed: {reason}")]
    WalWriteFailed {
        /// Reason for failure.
        reason: String,
    },

    /// WAL writer no longer accepts records.
    #[error("WAL writer is closed")]
    WalClosed,

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl CairnError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::Io,
            Self::WalCorrupted { .. } => ErrorCode::WalCorrupted,
            Self::WalWriteFailed { .. } => ErrorCode::WalWriteFailed,
            Self::WalClosed => ErrorCode::WalClosed,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
