//! Location providers.
//!
//! Real device location belongs to the platform shell; these cover the
//! command line and tests.

use async_trait::async_trait;
use codeshelf_core::{GeoPoint, LocationError, LocationProvider};

/// Never has a fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Result<GeoPoint, LocationError> {
        Err(LocationError::Unavailable("no location source".to_string()))
    }
}

/// Always reports the same point.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<GeoPoint, LocationError> {
        Ok(self.0)
    }
}

/// Behaves as if the user refused location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocation;

#[async_trait]
impl LocationProvider for DeniedLocation {
    async fn current_location(&self) -> Result<GeoPoint, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}
