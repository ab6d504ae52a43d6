//! Shared key-value byte storage.
//!
//! Both app processes see the same namespace. [`FileStorage`] keeps one file
//! per key inside the shared group directory; [`MemoryStorage`] is a cloneable
//! in-process stand-in, so two store instances can share it the way two
//! processes share the group directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::persistence::{read_optional, validate_key, write_atomic};

/// Byte store shared by every process of the app.
#[async_trait]
pub trait SharedStorage: Send + Sync {
    /// Returns the bytes stored under `key`, or `None` if never written.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the bytes stored under `key`.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

// ============================================================================
// File Storage
// ============================================================================

/// One file per key in a shared directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates storage rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for keys that are not plain file names.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl SharedStorage for FileStorage {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        let bytes = read_optional(&path).await?;
        debug!(found = bytes.is_some(), "Read shared key");
        Ok(bytes)
    }

    #[instrument(skip(self, bytes), fields(root = %self.root.display(), len = bytes.len()))]
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, bytes).await?;
        debug!("Wrote shared key");
        Ok(())
    }
}

// ============================================================================
// Memory Storage
// ============================================================================

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStorage for MemoryStorage {
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
