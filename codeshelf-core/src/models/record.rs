//! Code record types.
//!
//! This module contains the persisted unit of history:
//! - [`CodeRecord`] - One generated, scanned, or shared code
//! - [`Provenance`] - How the record was produced
//! - [`GeoPoint`] - Where a scanned code was found
//! - [`RecordId`] - Stable identifier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::traits::QrRenderer;

// ============================================================================
// Record Id
// ============================================================================

/// Opaque, unique identifier of a [`CodeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::Other(format!("Invalid record id '{s}': {e}")))
    }
}

// ============================================================================
// Geo Point
// ============================================================================

/// A latitude/longitude pair, persisted as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.latitude, point.longitude]
    }
}

impl FromStr for GeoPoint {
    type Err = CoreError;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| CoreError::Other(format!("Expected 'lat,lon', got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| CoreError::Other(format!("Invalid coordinate '{v}': {e}")))
        };
        let point = Self::new(parse(lat)?, parse(lon)?);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(CoreError::Other(format!("Coordinate out of range: {s}")))
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

// ============================================================================
// Provenance
// ============================================================================

/// How a record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Authored by the user and rendered locally.
    #[default]
    Created,
    /// Decoded from the camera feed.
    Scanned,
    /// Received through the share extension.
    Shared,
}

impl Provenance {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Scanned => "Scanned",
            Self::Shared => "Shared",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Code Record
// ============================================================================

/// One entry of the shared history.
///
/// Every field except `display_text`, `pinned`, and `created_at` is fixed at
/// construction. `display_text` only changes through [`CodeRecord::edit_text`],
/// which also bumps `created_at` and regenerates the image so the stored
/// image always renders the current text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    id: RecordId,
    display_text: String,
    original_text: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "image_base64"
    )]
    image_bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scan_location: Option<GeoPoint>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    provenance: Provenance,
    #[serde(default)]
    was_edited: bool,
}

impl CodeRecord {
    /// Creates a record with a fresh id, timestamped now.
    pub fn new(
        provenance: Provenance,
        original_text: impl Into<String>,
        display_text: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            display_text: display_text.into(),
            original_text: original_text.into(),
            image_bytes: None,
            scan_location: None,
            created_at: Utc::now(),
            pinned: false,
            provenance,
            was_edited: false,
        }
    }

    /// Creates a user-authored code and renders its image.
    pub fn generated(text: impl Into<String>, renderer: &dyn QrRenderer) -> Self {
        let text = text.into();
        Self::new(Provenance::Created, text.clone(), text).rendered_with(renderer)
    }

    /// Renders the image for the current display text.
    #[must_use]
    pub fn rendered_with(mut self, renderer: &dyn QrRenderer) -> Self {
        self.image_bytes = renderer.render(&self.display_text);
        self
    }

    /// Attaches the scan location.
    ///
    /// Only scanned records carry a location; for any other provenance the
    /// point is dropped.
    #[must_use]
    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        if self.provenance == Provenance::Scanned {
            self.scan_location = location.filter(GeoPoint::is_valid);
        }
        self
    }

    /// Overrides the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the record id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the text encoded in the code.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Returns the text as it was first scanned or shared.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Returns the encoded QR image, if one was rendered.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image_bytes.as_deref()
    }

    /// Returns where the code was scanned.
    pub fn scan_location(&self) -> Option<GeoPoint> {
        self.scan_location
    }

    /// Returns the creation (or last edit) time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true if the user pinned this record.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Returns how the record was produced.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Returns true if the record came from the camera.
    pub fn was_scanned(&self) -> bool {
        self.provenance == Provenance::Scanned
    }

    /// Returns true if the record was authored by the user.
    pub fn was_created(&self) -> bool {
        self.provenance == Provenance::Created
    }

    /// Returns true if the record came in through the share extension.
    pub fn was_shared(&self) -> bool {
        self.provenance == Provenance::Shared
    }

    /// Returns true once the user has edited the text.
    pub fn was_edited(&self) -> bool {
        self.was_edited
    }

    /// Label for list views. An edit overrides the original provenance.
    pub fn provenance_label(&self) -> &'static str {
        if self.was_edited {
            "Edited"
        } else {
            self.provenance.label()
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Sets the pinned flag.
    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Flips the pinned flag and returns the new value.
    pub fn toggle_pin(&mut self) -> bool {
        self.pinned = !self.pinned;
        self.pinned
    }

    /// Replaces the display text.
    ///
    /// Bumps `created_at`, marks the record edited, and re-renders the image.
    pub fn edit_text(&mut self, text: impl Into<String>, renderer: &dyn QrRenderer) {
        self.display_text = text.into();
        self.image_bytes = renderer.render(&self.display_text);
        self.created_at = Utc::now();
        self.was_edited = true;
    }
}

// ============================================================================
// Image Encoding
// ============================================================================

mod image_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| STANDARD.decode(s).map_err(D::Error::custom))
            .transpose()
    }
}

// ============================================================================
// Tests
// ============================================================================
