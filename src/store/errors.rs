//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transient failure; the caller aborts its transaction
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A lock was poisoned by a panicking writer
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// Unique constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Update of a row that does not exist
    #[error("missing row: {0}")]
    Missing(String),

    /// Persisted data failed validation on load
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// Snapshot file could not be read or written
    #[error("snapshot I/O: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}
