//! WAL error types.
//!
//! This module defines all error types for the Write-Ahead Log.

use std::io;
use thiserror::Error;

use cairn_common::error::{CairnError, ErrorCode};
use cairn_common::types::CommitSeq;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// I/O error during WAL operations.
    #[error("WAL I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// WAL segment file is corrupted.
    #[error("WAL segment corrupted at {seq}: {reason}")]
    SegmentCorrupted { seq: CommitSeq, reason: String },

    /// Invalid WAL segment magic number.
    #[error("Invalid WAL segment magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    /// Invalid WAL segment version.
    #[error("Unsupported WAL version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// WAL record checksum mismatch.
    #[error("WAL record checksum mismatch at {seq}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        seq: CommitSeq,
        expected: u32,
        computed: u32,
    },

    /// WAL record too large.
    #[error("WAL record too large: {size} bytes exceeds maximum {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    /// A record was assigned a sequence number but could not be persisted.
    ///
    /// The sequence number is burned: it will never be applied.
    #[error("WAL record {seq} was not persisted: {reason}")]
    PersistFailed { seq: CommitSeq, reason: String },

    /// WAL writer is shut down.
    #[error("WAL is closed")]
    Closed,

    /// WAL record deserialization error.
    #[error("Failed to deserialize WAL record: {reason}")]
    DeserializationError { reason: String },

    /// WAL record serialization error.
    #[error("Failed to serialize WAL record: {reason}")]
    SerializationError { reason: String },

    /// Configuration error.
    #[error("WAL configuration error: {reason}")]
    ConfigError { reason: String },
}

impl WalError {
    /// Creates a segment corrupted error.
    pub fn segment_corrupted(seq: CommitSeq, reason: impl Into<String>) -> Self {
        Self::SegmentCorrupted {
            seq,
            reason: reason.into(),
        }
    }

    /// Creates a checksum mismatch error.
    pub fn checksum_mismatch(seq: CommitSeq, expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            seq,
            expected,
            computed,
        }
    }

    /// Creates a record too large error.
    pub fn record_too_large(size: usize, max: usize) -> Self {
        Self::RecordTooLarge { size, max }
    }

    /// Creates a deserialization error.
    pub fn deserialization_error(reason: impl Into<String>) -> Self {
        Self::DeserializationError {
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization_error(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    /// Creates a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Returns the commit sequence this error consumed, if any.
    ///
    /// Callers that order work by sequence number must still account for
    /// a sequence that failed to persist.
    pub fn commit_seq(&self) -> Option<CommitSeq> {
        match self {
            Self::PersistFailed { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Returns true if this is a corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::SegmentCorrupted { .. }
                | Self::ChecksumMismatch { .. }
                | Self::InvalidMagic { .. }
                | Self::UnsupportedVersion { .. }
        )
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::Io,
            Self::SegmentCorrupted { .. }
            | Self::ChecksumMismatch { .. }
            | Self::InvalidMagic { .. }
            | Self::UnsupportedVersion { .. }
            | Self::DeserializationError { .. } => ErrorCode::WalCorrupted,
            Self::RecordTooLarge { .. }
            | Self::PersistFailed { .. }
            | Self::SerializationError { .. } => ErrorCode::WalWriteFailed,
            Self::Closed => ErrorCode::WalClosed,
            Self::ConfigError { .. } => ErrorCode::InvalidConfig,
        }
    }
}

impl From<WalError> for CairnError {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Io { source } => CairnError::Io { source },
            WalError::Closed => CairnError::WalClosed,
            WalError::ConfigError { reason } => CairnError::InvalidConfig { message: reason },
            WalError::SegmentCorrupted { seq, reason } => CairnError::WalCorrupted { seq, reason },
            WalError::ChecksumMismatch { seq, .. } => CairnError::WalCorrupted {
                seq,
                reason: "checksum mismatch".to_string(),
            },
            other if other.is_corruption() => CairnError::WalCorrupted {
                seq: CommitSeq::INVALID,
                reason: other.to_string(),
            },
            other => CairnError::WalWriteFailed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WalError::segment_corrupted(CommitSeq::new(100), "bad data");
        assert!(err.is_corruption());
        assert_eq!(err.code(), ErrorCode::WalCorrupted);

        let err = WalError::checksum_mismatch(CommitSeq::new(100), 0x1234, 0x5678);
        assert!(err.is_corruption());

        assert!(!WalError::Closed.is_corruption());
        assert_eq!(WalError::Closed.code(), ErrorCode::WalClosed);
    }

    #[test]
    fn test_persist_failed_carries_seq() {
        let err = WalError::PersistFailed {
            seq: CommitSeq::new(9),
            reason: "disk full".into(),
        };
        assert_eq!(err.commit_seq(), Some(CommitSeq::new(9)));
        assert_eq!(WalError::Closed.commit_seq(), None);
    }

    #[test]
    fn test_error_display() {
        let err = WalError::record_too_large(100_000_000, 10_000_000);
        let msg = format!("{}", err);
        assert!(msg.contains("100000000"));
        assert!(msg.contains("10000000"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let wal_err: WalError = io_err.into();
        assert!(matches!(wal_err, WalError::Io { .. }));
        let cairn: CairnError = wal_err.into();
        assert_eq!(cairn.code(), ErrorCode::Io);
    }

    #[test]
    fn test_closed_converts() {
        let cairn: CairnError = WalError::Closed.into();
        assert_eq!(cairn.code(), ErrorCode::WalClosed);
    }
}
