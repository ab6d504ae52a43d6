//! The recording step shared by the scan and share pipelines.

use codeshelf_core::{CodeRecord, GeoPoint, LocationProvider, Provenance, QrRenderer};
use codeshelf_store::HistoryStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::ScanError;
use crate::location::NoLocation;

/// Builds a [`CodeRecord`], appends it to history, and saves.
///
/// Saving also posts the cross-process change signal.
#[derive(Clone)]
pub struct Recorder {
    store: HistoryStore,
    location: Arc<dyn LocationProvider>,
    renderer: Option<Arc<dyn QrRenderer>>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("store", &self.store)
            .field("renders_images", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Creates a recorder with no location source and no image rendering.
    pub fn new(store: HistoryStore) -> Self {
        Self {
            store,
            location: Arc::new(NoLocation),
            renderer: None,
        }
    }

    /// Sets the location source consulted for scanned records.
    #[must_use]
    pub fn with_location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = location;
        self
    }

    /// Sets the renderer for record images.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn QrRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    async fn location_for(&self, provenance: Provenance) -> Option<GeoPoint> {
        if provenance != Provenance::Scanned {
            return None;
        }
        match self.location.current_location().await {
            Ok(point) => Some(point),
            Err(e) => {
                debug!(error = %e, "Recording without location");
                None
            }
        }
    }

    /// Records a payload.
    ///
    /// Location is best effort and only attached to scanned records. A
    /// render failure leaves the record without an image.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Store`] if the history cannot be saved.
    #[instrument(skip(self, original, display), fields(provenance = provenance.label()))]
    pub async fn record(
        &self,
        provenance: Provenance,
        original: &str,
        display: &str,
    ) -> Result<CodeRecord, ScanError> {
        let location = self.location_for(provenance).await;
        let mut record = CodeRecord::new(provenance, original, display).with_location(location);
        if let Some(renderer) = &self.renderer {
            record = record.rendered_with(renderer.as_ref());
        }

        let revision = self.store.add(record.clone()).await?;
        info!(
            id = %record.id(),
            revision,
            located = record.scan_location().is_some(),
            "Recorded code"
        );
        Ok(record)
    }
}
