//! Persistence round-trip and edge case tests.
//!
//! Tests JSON persistence and settings round-trip.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::history_store::ConflictPolicy;
use crate::persistence::{ensure_dir, load_json, load_json_or_default, save_json};
use crate::settings_store::{LogLevel, Settings, SettingsStore};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    let data = serde_json::json!({"key": "value"});

    save_json(&nested_path, &data).await.unwrap();
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<Settings, _> = load_json(&file_path).await;
    assert!(result.is_err());

    let fallback: Settings = load_json_or_default(&file_path).await;
    assert_eq!(fallback, Settings::default());
}

#[tokio::test]
async fn test_ensure_dir_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dir_path = temp_dir.path().join("group");

    ensure_dir(&dir_path).await.unwrap();
    ensure_dir(&dir_path).await.unwrap();

    assert!(dir_path.is_dir());
}

#[tokio::test]
async fn test_atomic_write_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    save_json(&file_path, &Settings::default()).await.unwrap();
    save_json(&file_path, &Settings::default()).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("settings.json")]);
}

// ============================================================================
// Settings Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_settings_full_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let settings = Settings {
        group_dir: Some(temp_dir.path().join("group")),
        history_key: "history_v2".to_string(),
        conflict_policy: ConflictPolicy::MergeByRevision,
        resolve_redirects: false,
        resolve_timeout_secs: 3,
        max_redirects: 4,
        extra_tracking_params: vec!["ref".to_string()],
        openable_schemes: vec!["tel".to_string()],
        record_location: false,
        log_level: LogLevel::Debug,
        ..Settings::default()
    };

    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_conflict_policy_serialized_snake_case() {
    let settings = Settings {
        conflict_policy: ConflictPolicy::MergeByRevision,
        ..Settings::default()
    };
    let value = serde_json::to_value(&settings).unwrap();
    assert_eq!(value["conflict_policy"], "merge_by_revision");
}

#[tokio::test]
async fn test_settings_store_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let store = SettingsStore::load(file_path.clone()).await;
    store
        .update(|s| s.extra_tracking_params.push("mc_cid".to_string()))
        .await;
    store.save().await.unwrap();

    let reloaded = SettingsStore::load(file_path).await;
    assert_eq!(reloaded.get().await.extra_tracking_params, vec!["mc_cid"]);
}

// ============================================================================
// Backward Compatibility Tests
// ============================================================================

#[tokio::test]
async fn test_load_minimal_json_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("minimal.json");

    tokio::fs::write(&file_path, "{}").await.unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();
    assert_eq!(loaded, Settings::default());
}

#[tokio::test]
async fn test_load_json_with_unknown_fields() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("extra_fields.json");

    let json = r#"{
        "max_redirects": 3,
        "unknown_field": "value",
        "nested_unknown": {"key": "value"}
    }"#;
    tokio::fs::write(&file_path, json).await.unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();
    assert_eq!(loaded.max_redirects, 3);
}

#[tokio::test]
async fn test_corrupt_settings_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "{ not json").await.unwrap();

    let store = SettingsStore::load(file_path).await;
    assert_eq!(store.get().await, Settings::default());
}
