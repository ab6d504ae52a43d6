//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::history_store::{
    ConflictPolicy, DEFAULT_CHANGE_CHANNEL, DEFAULT_HISTORY_KEY, HistoryOptions,
};
use crate::persistence::{default_group_dir, default_settings_path, load_json_or_default, save_json};

/// Schemes treated as openable by another app unless configured otherwise.
pub const DEFAULT_OPENABLE_SCHEMES: &[&str] = &[
    "mailto", "tel", "sms", "facetime", "maps", "geo", "spotify", "whatsapp", "tg", "itms-apps",
    "otpauth",
];

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    // ========================================================================
    // Shared Storage
    // ========================================================================
    /// Shared group directory override.
    pub group_dir: Option<PathBuf>,

    /// Storage key of the history collection.
    pub history_key: String,

    /// Cross-process change channel.
    pub change_channel: String,

    /// Save behaviour when a sibling process wrote concurrently.
    pub conflict_policy: ConflictPolicy,

    /// Poll period of the file-backed change signal, in milliseconds.
    pub signal_poll_ms: u64,

    // ========================================================================
    // Link Handling
    // ========================================================================
    /// Whether scanned web links are fetched to find their final target.
    pub resolve_redirects: bool,

    /// Per-request timeout for redirect resolution, in seconds.
    pub resolve_timeout_secs: u64,

    /// Maximum number of redirect hops.
    pub max_redirects: usize,

    /// Query parameter names to strip in addition to the built-in list.
    pub extra_tracking_params: Vec<String>,

    /// Schemes another app can open.
    pub openable_schemes: Vec<String>,

    // ========================================================================
    // Recording
    // ========================================================================
    /// Attach the device location to scanned records.
    pub record_location: bool,

    /// Render QR images for new records.
    pub render_images: bool,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group_dir: None,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            change_channel: DEFAULT_CHANGE_CHANNEL.to_string(),
            conflict_policy: ConflictPolicy::default(),
            signal_poll_ms: 500,
            resolve_redirects: true,
            resolve_timeout_secs: 10,
            max_redirects: 10,
            extra_tracking_params: Vec::new(),
            openable_schemes: DEFAULT_OPENABLE_SCHEMES
                .iter()
                .map(ToString::to_string)
                .collect(),
            record_location: true,
            render_images: true,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Returns the effective shared group directory.
    pub fn group_dir(&self) -> PathBuf {
        self.group_dir.clone().unwrap_or_else(default_group_dir)
    }

    /// Returns the redirect resolution timeout.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs.max(1))
    }

    /// Returns the change-signal poll period.
    pub fn signal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.signal_poll_ms.max(10))
    }

    /// Returns the history store options these settings describe.
    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            key: self.history_key.clone(),
            channel: self.change_channel.clone(),
            policy: self.conflict_policy,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
}

impl SettingsStore {
    /// Creates a store holding defaults, backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
            notify,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing or unreadable file yields defaults.
    pub async fn load(path: PathBuf) -> Self {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json_or_default(&path).await
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change();
    }

    /// Restores defaults and notifies subscribers.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Gets the conflict policy.
    pub async fn conflict_policy(&self) -> ConflictPolicy {
        self.settings.read().await.conflict_policy
    }

    /// Sets the conflict policy.
    pub async fn set_conflict_policy(&self, policy: ConflictPolicy) {
        self.update(|s| s.conflict_policy = policy).await;
    }

    /// Gets the history store options.
    pub async fn history_options(&self) -> HistoryOptions {
        self.settings.read().await.history_options()
    }

    /// Gets the effective shared group directory.
    pub async fn group_dir(&self) -> PathBuf {
        self.settings.read().await.group_dir()
    }
}
