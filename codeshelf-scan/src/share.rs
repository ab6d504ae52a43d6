//! Share ingest.
//!
//! The share extension receives one URL or text per invocation. It
//! classifies it, strips tracking parameters from links, and records it
//! without any network access.

use codeshelf_core::{CodeRecord, Provenance, SchemeOpener, TrackingFilter};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::classify::{classify, display_text};
use crate::error::ScanError;
use crate::recorder::Recorder;

/// One-shot pipeline for shared content.
#[derive(Clone)]
pub struct ShareIngestPipeline {
    recorder: Recorder,
    opener: Arc<dyn SchemeOpener>,
    filter: TrackingFilter,
}

impl ShareIngestPipeline {
    /// Creates a share pipeline.
    pub fn new(recorder: Recorder, opener: Arc<dyn SchemeOpener>) -> Self {
        Self {
            recorder,
            opener,
            filter: TrackingFilter::new(),
        }
    }

    /// Replaces the tracking filter.
    #[must_use]
    pub fn with_filter(mut self, filter: TrackingFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Records shared content.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Store`] if the history cannot be saved.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub async fn ingest(&self, payload: &str) -> Result<CodeRecord, ScanError> {
        let kind = classify(payload, self.opener.as_ref());
        debug!(kind = kind.label(), "Classified shared payload");
        let display = display_text(&kind, payload, &self.filter);
        self.recorder
            .record(Provenance::Shared, payload, &display)
            .await
    }
}
