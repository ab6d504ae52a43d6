//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use codeshelf_core::link::find_link;
use codeshelf_core::{CodeRecord, TrackingFilter, prettify};
use codeshelf_fetch::Resolution;
use codeshelf_scan::ScanEvent;
use serde::{Serialize, Serializer};
use url::Url;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a single history record.
///
/// Image bytes are summarized by size; they stay in the history file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutput {
    pub id: String,
    pub display_text: String,
    pub original_text: String,
    pub provenance: String,
    pub label: String,
    pub pinned: bool,
    pub edited: bool,
    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<usize>,
}

impl From<&CodeRecord> for RecordOutput {
    fn from(record: &CodeRecord) -> Self {
        Self {
            id: record.id().to_string(),
            display_text: record.display_text().to_string(),
            original_text: record.original_text().to_string(),
            provenance: record.provenance().label().to_lowercase(),
            label: record.provenance_label().to_string(),
            pinned: record.is_pinned(),
            edited: record.was_edited(),
            created_at: record.created_at(),
            location: record.scan_location().map(Into::into),
            image_size: record.image_bytes().map(<[u8]>::len),
        }
    }
}

/// One scan session event, as a JSON line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutput {
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordOutput>,
}

impl From<&ScanEvent> for EventOutput {
    fn from(event: &ScanEvent) -> Self {
        let mut output = Self {
            event: event.label(),
            payload: None,
            reason: None,
            record: None,
        };
        match event {
            ScanEvent::Accepted { payload }
            | ScanEvent::Duplicate { payload }
            | ScanEvent::Resolving { payload } => output.payload = Some(payload.clone()),
            ScanEvent::ResolutionFailed { payload, reason }
            | ScanEvent::RecordFailed { payload, reason } => {
                output.payload = Some(payload.clone());
                output.reason = Some(reason.clone());
            }
            ScanEvent::Recorded(record) => output.record = Some(RecordOutput::from(record)),
            ScanEvent::DecodeFailed => {}
        }
        output
    }
}

/// Result of following a redirect chain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutput {
    pub start: String,
    pub hops: Vec<String>,
    pub final_url: String,
}

impl ResolutionOutput {
    /// Builds the output for a chain that began at `start`.
    pub fn new(start: &Url, resolution: &Resolution) -> Self {
        Self {
            start: start.to_string(),
            hops: resolution.hops.iter().map(Url::to_string).collect(),
            final_url: resolution.final_url.to_string(),
        }
    }
}

/// Result of offline cleaning.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOutput {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub cleaned: String,
    pub pretty: String,
}

impl CleanOutput {
    /// Extracts the first link from `input` and strips it with `filter`.
    ///
    /// Text without a link is passed through unchanged.
    pub fn new(input: &str, filter: &TrackingFilter) -> Self {
        let link = find_link(input);
        let cleaned = match link {
            Some(link) => filter.sanitize(link),
            None => input.to_string(),
        };
        Self {
            input: input.to_string(),
            link: link.map(str::to_string),
            pretty: prettify(&cleaned),
            cleaned,
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a scan event. Always a single line, so a session's output
    /// can be read as JSON lines.
    pub fn format_event(&self, event: &ScanEvent) -> Result<String> {
        Ok(serde_json::to_string(&EventOutput::from(event))?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}
