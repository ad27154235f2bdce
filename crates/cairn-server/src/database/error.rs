//! Database error types.

use thiserror::Error;

use cairn_common::error::{CairnError, ErrorCode};
use cairn_common::types::SpaceId;
use cairn_storage::StorageError;
use cairn_wal::WalError;

/// Database result type.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No such object space.
    #[error("object space {space_id} does not exist")]
    SpaceNotFound { space_id: SpaceId },

    /// The WAL writer is shut down; logged mutations cannot be accepted.
    #[error("WAL writer is unavailable")]
    WriterUnavailable,

    /// Storage error.
    #[error("storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    /// WAL error.
    #[error("WAL error: {source}")]
    Wal { source: WalError },

    /// Configuration error.
    #[error("configuration error: {source}")]
    Config {
        #[from]
        source: CairnError,
    },
}

impl From<WalError> for DatabaseError {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Closed => DatabaseError::WriterUnavailable,
            source => DatabaseError::Wal { source },
        }
    }
}

impl DatabaseError {
    /// Returns true for a duplicate key conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage { source } if source.is_conflict())
    }

    /// Returns true for a missing tuple.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage { source } if source.is_not_found())
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SpaceNotFound { .. } => ErrorCode::SpaceNotFound,
            Self::WriterUnavailable => ErrorCode::WalClosed,
            Self::Storage { source } => source.code(),
            Self::Wal { source } => source.code(),
            Self::Config { source } => source.code(),
        }
    }
}
