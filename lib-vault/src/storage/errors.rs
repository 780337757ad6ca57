//! Storage-specific error types

use thiserror::Error;

/// Storage layer result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage corruption detected: {0}")]
    Corruption(String),

    #[error("Write operation failed: {0}")]
    WriteFailed(String),

    #[error("Sled backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl StorageError {
    /// Corruption needs an operator; everything else may clear on retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StorageError::WriteFailed(_) | StorageError::BackendError(_))
    }
}
