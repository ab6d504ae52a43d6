//! Scan error types.

use codeshelf_fetch::FetchError;
use codeshelf_store::StoreError;
use thiserror::Error;

/// Errors that can occur while turning a payload into a record.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Redirect resolution failed.
    #[error("Resolution failed: {0}")]
    Resolution(#[from] FetchError),

    /// The record could not be saved.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The scan session has stopped.
    #[error("Scan session closed")]
    Closed,
}

impl ScanError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::Resolution(e) => e.is_transient(),
            ScanError::Store(e) => e.is_transient(),
            ScanError::Closed => false,
        }
    }
}
