//! Serde serialization/deserialization tests for core types.
//!
//! The history collection is shared between processes that may run different
//! app versions, so the on-disk shape of these types matters.

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::{CodeRecord, GeoPoint, Provenance};

// ============================================================================
// Provenance Serde Tests
// ============================================================================

#[test]
fn test_provenance_snake_case() {
    let test_cases = vec![
        (r#""created""#, Provenance::Created),
        (r#""scanned""#, Provenance::Scanned),
        (r#""shared""#, Provenance::Shared),
    ];

    for (json, expected) in test_cases {
        let result: Provenance = serde_json::from_str(json).unwrap();
        assert_eq!(result, expected, "Failed for {}", json);
    }
}

#[test]
fn test_provenance_invalid_deserialize() {
    let result: Result<Provenance, _> = serde_json::from_str(r#""teleported""#);
    assert!(result.is_err());
}

// ============================================================================
// GeoPoint Serde Tests
// ============================================================================

#[test]
fn test_geo_point_is_two_element_array() {
    let point = GeoPoint::new(48.8566, 2.3522);
    let value = serde_json::to_value(point).unwrap();
    assert_eq!(value, json!([48.8566, 2.3522]));

    let back: GeoPoint = serde_json::from_value(value).unwrap();
    assert_eq!(back, point);
}

// ============================================================================
// CodeRecord Serde Tests
// ============================================================================

#[test]
fn test_record_roundtrip_with_image_and_location() {
    let record = CodeRecord::new(Provenance::Scanned, "https://bit.ly/x", "https://example.com/")
        .with_location(Some(GeoPoint::new(1.0, 2.0)))
        .with_created_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

    let json = serde_json::to_string(&record).unwrap();
    let back: CodeRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_image_bytes_are_base64() {
    struct Fixed;
    impl crate::QrRenderer for Fixed {
        fn render(&self, _text: &str) -> Option<Vec<u8>> {
            Some(vec![0x89, b'P', b'N', b'G'])
        }
    }

    let record = CodeRecord::generated("hello", &Fixed);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["image_bytes"], json!("iVBORw=="));

    let back: CodeRecord = serde_json::from_value(value).unwrap();
    assert_eq!(back.image_bytes(), Some(&[0x89, b'P', b'N', b'G'][..]));
}

#[test]
fn test_optional_fields_omitted() {
    let record = CodeRecord::new(Provenance::Created, "a", "a");
    let value = serde_json::to_value(&record).unwrap();
    assert!(value.get("image_bytes").is_none());
    assert!(value.get("scan_location").is_none());
}

#[test]
fn test_record_tolerates_missing_and_unknown_fields() {
    // Older writers did not store provenance, pin state, or edit flags.
    let json = r#"{
        "id": "6f1c2b8e-3c1d-4c55-9d1e-6b5a2b7f9a10",
        "display_text": "hello",
        "original_text": "hello",
        "created_at": "2024-01-01T00:00:00Z",
        "favorite_color": "green"
    }"#;

    let record: CodeRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.display_text(), "hello");
    assert_eq!(record.provenance(), Provenance::Created);
    assert!(!record.is_pinned());
    assert!(!record.was_edited());
    assert!(record.image_bytes().is_none());
}

#[test]
fn test_record_rejects_bad_image_encoding() {
    let json = r#"{
        "id": "6f1c2b8e-3c1d-4c55-9d1e-6b5a2b7f9a10",
        "display_text": "hello",
        "original_text": "hello",
        "image_bytes": "***",
        "created_at": "2024-01-01T00:00:00Z"
    }"#;

    assert!(serde_json::from_str::<CodeRecord>(json).is_err());
}
