//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

/// Error type for link resolution.
///
/// Every variant means the same thing to the scan pipeline: the link could
/// not be resolved and no record is written.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The whole redirect chain took too long.
    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),

    /// A redirect target could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The chain was longer than allowed.
    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    /// The starting URL is not `http` or `https`.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

impl FetchError {
    /// Returns true if a later attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}
