// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # CodeShelf Store
//!
//! Shared state for the CodeShelf processes.
//!
//! This crate provides:
//!
//! - **HistoryStore**: The code history, shared between app processes
//! - **SharedStorage**: Byte storage in the shared group directory
//! - **ChangeSignal**: Cross-process "history changed" notices
//! - **SettingsStore**: User preferences with persistence
//!
//! ## Usage
//!
//! ```ignore
//! use codeshelf_store::{FileSignal, FileStorage, HistoryOptions, HistoryStore};
//! use std::sync::Arc;
//!
//! let dir = codeshelf_store::default_group_dir();
//! let history = HistoryStore::open(
//!     Arc::new(FileStorage::new(&dir)),
//!     Arc::new(FileSignal::new(&dir)),
//!     HistoryOptions::default(),
//! )
//! .await;
//!
//! // Reload whenever another process saves
//! let _sync = history.spawn_external_sync()?;
//!
//! let mut rx = history.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{} codes", history.len().await);
//! }
//! ```

pub mod error;
pub mod history_store;
pub mod persistence;
pub mod settings_store;
pub mod signal;
pub mod storage;

pub use error::StoreError;
pub use history_store::{
    ConflictPolicy, DEFAULT_CHANGE_CHANNEL, DEFAULT_HISTORY_KEY, HistoryOptions, HistoryStore,
};
pub use persistence::{
    default_config_dir, default_group_dir, default_settings_path, load_json, load_json_or_default,
    save_json,
};
pub use settings_store::{DEFAULT_OPENABLE_SCHEMES, LogLevel, Settings, SettingsStore};
pub use signal::{ChangeSignal, FileSignal, LocalSignal, SignalBus, SignalReceiver};
pub use storage::{FileStorage, MemoryStorage, SharedStorage};

#[cfg(test)]
mod persistence_tests;
