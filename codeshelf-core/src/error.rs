//! Core error types for `CodeShelf`.

use thiserror::Error;

/// Core error type for `CodeShelf` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::InvalidUrl(err.to_string())
    }
}
