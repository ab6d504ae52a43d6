//! Trait definitions for `CodeShelf`.
//!
//! These traits describe the platform collaborators the scan and share
//! pipelines depend on. Implementations are passed in explicitly so the
//! pipelines can be exercised without a camera, GPS, or a real OS.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::models::GeoPoint;

// ============================================================================
// Location
// ============================================================================

/// Errors a location provider can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// The user has not granted location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No fix is available right now.
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the device location on request.
///
/// Callers treat every error as "no location"; a missing fix never blocks
/// record creation.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the current coordinate, if one can be obtained.
    async fn current_location(&self) -> Result<GeoPoint, LocationError>;
}

// ============================================================================
// Scheme Opening
// ============================================================================

/// Answers whether the platform can hand a URL to another app.
pub trait SchemeOpener: Send + Sync {
    /// Returns true if `url` maps to an app-open action.
    fn can_open(&self, url: &Url) -> bool;
}

// ============================================================================
// QR Rendering
// ============================================================================

/// Renders text into an encoded raster image of a QR code.
pub trait QrRenderer: Send + Sync {
    /// Returns encoded image bytes, or `None` if the text cannot be encoded.
    fn render(&self, text: &str) -> Option<Vec<u8>>;
}
