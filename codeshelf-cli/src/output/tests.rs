//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_age, truncate};
    use chrono::{Duration, Utc};
    use codeshelf_core::{CodeRecord, GeoPoint, Provenance};
    use codeshelf_scan::ScanEvent;

    fn scanned(text: &str) -> CodeRecord {
        CodeRecord::new(Provenance::Scanned, text, text)
    }

    #[test]
    fn test_record_line_prettifies_links() {
        let formatter = TextFormatter::new(false);
        let record = scanned("https://www.example.com/page");
        let line = formatter.format_record_line(&record);

        assert!(line.contains("example.com/page"));
        assert!(!line.contains("https://"));
        assert!(line.contains("Scanned"));
        assert!(line.contains("just now"));
    }

    #[test]
    fn test_record_line_short_id() {
        let formatter = TextFormatter::new(false);
        let record = scanned("hello");
        let id = record.id().to_string();
        let line = formatter.format_record_line(&record);

        assert!(line.contains(&id[..8]));
        assert!(!line.contains(&id));
    }

    #[test]
    fn test_record_line_pin_marker() {
        let formatter = TextFormatter::new(false);
        let mut record = scanned("hello");
        assert!(formatter.format_record_line(&record).starts_with(' '));

        record.set_pinned(true);
        assert!(formatter.format_record_line(&record).starts_with('*'));
    }

    #[test]
    fn test_history_empty() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_history(&[]), "No history yet\n");
    }

    #[test]
    fn test_history_one_line_per_record() {
        let formatter = TextFormatter::new(false);
        let records = vec![scanned("one"), scanned("two"), scanned("three")];
        let output = formatter.format_history(&records);
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_record_details() {
        let formatter = TextFormatter::new(false);
        let record = CodeRecord::new(
            Provenance::Scanned,
            "https://example.com/?utm_source=x",
            "https://example.com/",
        )
        .with_location(Some(GeoPoint::new(52.52, 13.405)));
        let output = formatter.format_record(&record);

        assert!(output.starts_with("https://example.com/\n"));
        assert!(output.contains("Original: https://example.com/?utm_source=x"));
        assert!(output.contains("Location: 52.52000,13.40500"));
        assert!(!output.contains("Pinned"));
        assert!(!output.contains("Image"));
    }

    #[test]
    fn test_record_details_hide_unchanged_original() {
        let formatter = TextFormatter::new(false);
        let record = CodeRecord::new(Provenance::Shared, "hello", "hello");
        let output = formatter.format_record(&record);
        assert!(!output.contains("Original"));
        assert!(output.contains("Kind:     Shared"));
    }

    #[test]
    fn test_colors_toggle() {
        let record = scanned("hello");
        let plain = TextFormatter::new(false).format_record_line(&record);
        let colored = TextFormatter::new(true).format_record_line(&record);

        assert!(!plain.contains("\x1b["));
        assert!(colored.contains("\x1b[32m"), "Scanned label should be green");
    }

    #[test]
    fn test_label_color_per_provenance() {
        let formatter = TextFormatter::new(true);
        let created = CodeRecord::new(Provenance::Created, "hello", "hello");
        let shared = CodeRecord::new(Provenance::Shared, "hello", "hello");

        assert!(formatter.format_record_line(&created).contains("\x1b[36m"));
        assert!(formatter.format_record_line(&shared).contains("\x1b[34m"));
    }

    #[test]
    fn test_event_lines() {
        let formatter = TextFormatter::new(false);

        let duplicate = ScanEvent::Duplicate {
            payload: "abc".to_string(),
        };
        assert!(formatter.format_event(&duplicate).contains("duplicate"));

        let failed = ScanEvent::ResolutionFailed {
            payload: "https://bit.ly/x".to_string(),
            reason: "timed out".to_string(),
        };
        let line = formatter.format_event(&failed);
        assert!(line.starts_with('✗'));
        assert!(line.contains("timed out"));

        let recorded = ScanEvent::Recorded(scanned("hello"));
        assert!(formatter.format_event(&recorded).starts_with('✓'));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("this is too long", 8), "this is…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now), "just now");
        assert_eq!(format_age(now - Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(now - Duration::hours(3)), "3h ago");
        assert_eq!(format_age(now - Duration::days(2)), "2d ago");
        assert_eq!(format_age(now - Duration::days(30)).len(), "2024-01-01".len());
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{CleanOutput, EventOutput, JsonFormatter, RecordOutput};
    use codeshelf_core::{CodeRecord, GeoPoint, Provenance, QrRenderer, TrackingFilter};
    use codeshelf_scan::ScanEvent;

    struct FixedImage;

    impl QrRenderer for FixedImage {
        fn render(&self, _text: &str) -> Option<Vec<u8>> {
            Some(vec![0u8; 42])
        }
    }

    #[test]
    fn test_format_compact_and_pretty() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(JsonFormatter::new(false).format(&value).unwrap(), r#"{"a":1}"#);
        assert!(JsonFormatter::new(true).format(&value).unwrap().contains('\n'));
    }

    #[test]
    fn test_record_output_camel_case() {
        let record = CodeRecord::new(Provenance::Scanned, "orig", "shown")
            .with_location(Some(GeoPoint::new(1.0, 2.0)));
        let json = JsonFormatter::new(false)
            .format(&RecordOutput::from(&record))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["displayText"], "shown");
        assert_eq!(value["originalText"], "orig");
        assert_eq!(value["provenance"], "scanned");
        assert_eq!(value["label"], "Scanned");
        assert_eq!(value["pinned"], false);
        assert_eq!(value["location"], serde_json::json!([1.0, 2.0]));
        assert!(value.get("imageSize").is_none());
        assert!(value["createdAt"].as_str().is_some());
    }

    #[test]
    fn test_record_output_image_size_and_edit_label() {
        let mut record = CodeRecord::generated("hello", &FixedImage);
        record.edit_text("bye", &FixedImage);
        let output = RecordOutput::from(&record);

        assert_eq!(output.image_size, Some(42));
        assert_eq!(output.label, "Edited");
        assert_eq!(output.provenance, "created");
        assert!(output.edited);
    }

    #[test]
    fn test_event_output_fields() {
        let event = ScanEvent::ResolutionFailed {
            payload: "https://bit.ly/x".to_string(),
            reason: "timeout".to_string(),
        };
        let json = JsonFormatter::new(false).format_event(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["event"], "resolution_failed");
        assert_eq!(value["payload"], "https://bit.ly/x");
        assert_eq!(value["reason"], "timeout");
        assert!(value.get("record").is_none());
    }

    #[test]
    fn test_event_output_recorded() {
        let record = CodeRecord::new(Provenance::Scanned, "a", "a");
        let output = EventOutput::from(&ScanEvent::Recorded(record.clone()));
        assert_eq!(output.event, "recorded");
        assert!(output.payload.is_none());
        assert_eq!(output.record.map(|r| r.id), Some(record.id().to_string()));
    }

    #[test]
    fn test_event_json_is_single_line() {
        let record = CodeRecord::new(Provenance::Scanned, "a", "a");
        let json = JsonFormatter::new(true)
            .format_event(&ScanEvent::Recorded(record))
            .unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_clean_output_extracts_and_strips() {
        let output = CleanOutput::new(
            "see https://www.example.com/a?utm_source=x&id=3 now",
            &TrackingFilter::new(),
        );
        assert_eq!(
            output.link.as_deref(),
            Some("https://www.example.com/a?utm_source=x&id=3")
        );
        assert_eq!(output.cleaned, "https://www.example.com/a?id=3");
        assert_eq!(output.pretty, "example.com/a?id=3");
    }

    #[test]
    fn test_clean_output_plain_text() {
        let output = CleanOutput::new("just words", &TrackingFilter::new());
        assert!(output.link.is_none());
        assert_eq!(output.cleaned, "just words");
        assert_eq!(output.pretty, "just words");
    }
}
