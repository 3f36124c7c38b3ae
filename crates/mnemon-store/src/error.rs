//! Error types for the store crate.

use mnemon_types::MemoryError;
use thiserror::Error;

/// Errors raised by long-term memory persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot payload did not have the expected shape
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl From<StoreError> for MemoryError {
    fn from(err: StoreError) -> Self {
        MemoryError::Storage(err.to_string())
    }
}
