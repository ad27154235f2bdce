//! Storage error types.

use thiserror::Error;

use cairn_common::error::{CairnError, ErrorCode};
use cairn_common::types::{FieldType, SpaceId};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by object spaces and indexes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique index already holds the derived key.
    #[error("Duplicate key exists in unique index {index}")]
    DuplicateKey { index: usize },

    /// No tuple exists for the key.
    #[error("Tuple not found")]
    NotFound,

    /// Tuple or key does not match the space definition.
    #[error("Malformed request: {reason}")]
    Malformed { reason: String },

    /// A key part holds a value of the wrong type.
    #[error("Field {fieldno} type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        fieldno: usize,
        expected: FieldType,
        actual: &'static str,
    },

    /// A key part reads past the end of the tuple.
    #[error("Tuple field {fieldno} is missing")]
    FieldMissing { fieldno: usize },

    /// An update operation cannot be applied.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Index number out of range.
    #[error("No index {index} in space {space_id}")]
    IndexNotFound { space_id: SpaceId, index: usize },

    /// Operation not available on this index type.
    #[error("Operation not supported: {operation}")]
    NotSupported { operation: String },

    /// Space definition rejected.
    #[error("Invalid space definition: {source}")]
    Config {
        #[from]
        source: CairnError,
    },
}

impl StorageError {
    /// Creates a malformed request error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Returns true for a duplicate key conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns true for a missing tuple.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true when the request itself does not fit the space.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::TypeMismatch { .. } | Self::FieldMissing { .. }
        )
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateKey { .. } => ErrorCode::KeyExists,
            Self::NotFound => ErrorCode::KeyNotFound,
            Self::Malformed { .. } => ErrorCode::MalformedTuple,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::FieldMissing { .. } => ErrorCode::FieldMissing,
            Self::InvalidArgument { .. } => ErrorCode::IllegalUpdate,
            Self::IndexNotFound { .. } => ErrorCode::IndexNotFound,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::Config { source } => source.code(),
        }
    }
}
