//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted history could not be decoded.
    #[error("Stored history is corrupt: {0}")]
    StorageCorrupt(String),

    /// Storage key or channel name is not usable as a file name.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
