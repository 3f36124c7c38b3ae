//! Error types for the mnemon memory engine.

use thiserror::Error;

/// Unified error type for memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Settings failed to load or validate
    #[error("Configuration error: {0}")]
    Config(String),

    /// A memory record or snapshot could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The durable store failed to read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Store request vetoed before persistence
    #[error("Memory store rejected by policy: {0}")]
    PolicyRejected(String),

    /// Referenced memory id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied value out of range or unparseable
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
