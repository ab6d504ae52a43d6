//! Events emitted by a scan session.

use codeshelf_core::CodeRecord;

/// Something that happened in a scan session.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A new payload passed the debouncer. Shells play haptic or audio
    /// feedback on this.
    Accepted {
        /// The payload as decoded.
        payload: String,
    },
    /// The payload repeated the last accepted one and was dropped.
    Duplicate {
        /// The payload as decoded.
        payload: String,
    },
    /// A frame was captured but nothing could be decoded.
    DecodeFailed,
    /// Redirect resolution started. Shells show a loading state until the
    /// matching `Recorded` or `ResolutionFailed`.
    Resolving {
        /// The payload as decoded.
        payload: String,
    },
    /// Redirect resolution failed. No record was created.
    ResolutionFailed {
        /// The payload as decoded.
        payload: String,
        /// Human-readable cause.
        reason: String,
    },
    /// A record was saved.
    Recorded(CodeRecord),
    /// A record could not be saved.
    RecordFailed {
        /// The payload as decoded.
        payload: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl ScanEvent {
    /// Short name for logs and machine-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            ScanEvent::Accepted { .. } => "accepted",
            ScanEvent::Duplicate { .. } => "duplicate",
            ScanEvent::DecodeFailed => "decode_failed",
            ScanEvent::Resolving { .. } => "resolving",
            ScanEvent::ResolutionFailed { .. } => "resolution_failed",
            ScanEvent::Recorded(_) => "recorded",
            ScanEvent::RecordFailed { .. } => "record_failed",
        }
    }
}

