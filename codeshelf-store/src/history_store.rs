//! Shared code history.
//!
//! Every process of the app holds its own [`HistoryStore`] over the same
//! [`SharedStorage`] key. Each mutation is followed by a save, which writes
//! the whole collection and posts a [`ChangeSignal`] so sibling processes
//! reload.
//!
//! The persisted form is a revision-stamped envelope:
//!
//! ```json
//! { "revision": 7, "records": [ ... ] }
//! ```
//!
//! A bare JSON array of records (the pre-envelope layout) is still accepted
//! on load and treated as revision 0.
//!
//! How a save treats a sibling's newer write depends on [`ConflictPolicy`].

use codeshelf_core::{CodeRecord, QrRenderer, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::signal::ChangeSignal;
use crate::storage::SharedStorage;

/// Default storage key of the collection.
pub const DEFAULT_HISTORY_KEY: &str = "code_history";

/// Default cross-process channel name.
pub const DEFAULT_CHANGE_CHANNEL: &str = "codeshelf.history.changed";

// ============================================================================
// Options
// ============================================================================

/// What a save does when another process wrote since our last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Overwrite the stored collection with ours. A sibling's unseen write
    /// is lost.
    #[default]
    LastWriterWins,
    /// Re-read the stored collection and merge by record id before writing.
    MergeByRevision,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictPolicy::LastWriterWins => write!(f, "last_writer_wins"),
            ConflictPolicy::MergeByRevision => write!(f, "merge_by_revision"),
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_writer_wins" | "lww" => Ok(ConflictPolicy::LastWriterWins),
            "merge_by_revision" | "merge" => Ok(ConflictPolicy::MergeByRevision),
            other => Err(StoreError::Config(format!("Unknown conflict policy: {other}"))),
        }
    }
}

/// Where and how a [`HistoryStore`] persists.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Storage key of the collection.
    pub key: String,
    /// Change-signal channel.
    pub channel: String,
    /// Save behaviour on concurrent writes.
    pub policy: ConflictPolicy,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_HISTORY_KEY.to_string(),
            channel: DEFAULT_CHANGE_CHANNEL.to_string(),
            policy: ConflictPolicy::default(),
        }
    }
}

impl HistoryOptions {
    /// Sets the conflict policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// ============================================================================
// Persisted Form
// ============================================================================

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    revision: u64,
    records: &'a [CodeRecord],
}

#[derive(Deserialize)]
struct Envelope {
    revision: u64,
    records: Vec<CodeRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Persisted {
    Envelope(Envelope),
    Legacy(Vec<CodeRecord>),
}

fn decode(bytes: &[u8]) -> Result<Envelope, StoreError> {
    match serde_json::from_slice::<Persisted>(bytes) {
        Ok(Persisted::Envelope(envelope)) => Ok(envelope),
        Ok(Persisted::Legacy(records)) => Ok(Envelope {
            revision: 0,
            records,
        }),
        Err(e) => Err(StoreError::StorageCorrupt(e.to_string())),
    }
}

/// Keeps the first record for every id.
fn dedupe(records: Vec<CodeRecord>) -> Vec<CodeRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();
    let out: Vec<CodeRecord> = records.into_iter().filter(|r| seen.insert(r.id())).collect();
    if out.len() != before {
        warn!(dropped = before - out.len(), "Dropped records with duplicate ids");
    }
    out
}

// ============================================================================
// Inner State
// ============================================================================

#[derive(Debug, Default)]
struct HistoryInner {
    records: Vec<CodeRecord>,
    /// Revision of the stored collection as of our last load or save.
    revision: u64,
    /// Ids present at our last load or save.
    synced: HashSet<RecordId>,
    /// Ids appended or mutated locally since then.
    dirty: HashSet<RecordId>,
    /// Ids removed locally since then.
    removed: HashSet<RecordId>,
}

impl HistoryInner {
    fn reset_sync(&mut self, revision: u64) {
        self.revision = revision;
        self.synced = self.records.iter().map(CodeRecord::id).collect();
        self.dirty.clear();
        self.removed.clear();
    }

    fn has_pending(&self) -> bool {
        !self.dirty.is_empty() || !self.removed.is_empty()
    }

    /// Takes a stored collection as the new sync point. Local changes not
    /// yet saved are merged on top instead of dropped.
    fn install(&mut self, stored: Vec<CodeRecord>, revision: u64) {
        if !self.has_pending() {
            self.records = stored;
            self.reset_sync(revision);
            return;
        }

        let stored_ids: HashSet<RecordId> = stored.iter().map(CodeRecord::id).collect();
        self.merge_from(stored);
        self.revision = revision;
        self.synced = stored_ids;
        let present: HashSet<RecordId> = self.records.iter().map(CodeRecord::id).collect();
        self.dirty.retain(|id| present.contains(id));
    }

    fn upsert(&mut self, record: CodeRecord) {
        let id = record.id();
        self.removed.remove(&id);
        self.dirty.insert(id);
        if let Some(existing) = self.records.iter_mut().find(|r| r.id() == id) {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    fn mutate<T, F>(&mut self, id: RecordId, f: F) -> Option<T>
    where
        F: FnOnce(&mut CodeRecord) -> T,
    {
        let record = self.records.iter_mut().find(|r| r.id() == id)?;
        let out = f(record);
        self.dirty.insert(id);
        Some(out)
    }

    fn remove(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        let removed = self.records.len() != before;
        if removed {
            self.dirty.remove(&id);
            self.removed.insert(id);
        }
        removed
    }

    fn replace_all(&mut self, records: Vec<CodeRecord>) {
        let records = dedupe(records);
        let kept: HashSet<RecordId> = records.iter().map(CodeRecord::id).collect();
        let dropped: Vec<RecordId> = self
            .records
            .iter()
            .map(CodeRecord::id)
            .filter(|id| !kept.contains(id))
            .collect();
        self.removed.extend(dropped);
        self.dirty.extend(kept);
        self.records = records;
    }

    /// Three-way merge of our state with a sibling's newer collection.
    fn merge_from(&mut self, stored: Vec<CodeRecord>) {
        let stored_ids: HashSet<RecordId> = stored.iter().map(CodeRecord::id).collect();
        let mut local: Vec<Option<CodeRecord>> =
            std::mem::take(&mut self.records).into_iter().map(Some).collect();
        let mut merged = Vec::with_capacity(stored.len() + local.len());

        for record in stored {
            let id = record.id();
            if self.removed.contains(&id) {
                continue;
            }
            let ours = self
                .dirty
                .contains(&id)
                .then(|| local.iter_mut().find(|r| r.as_ref().is_some_and(|r| r.id() == id)))
                .flatten()
                .and_then(Option::take);
            merged.push(ours.unwrap_or(record));
        }

        // Local records the sibling never saw. Ones we had synced but the
        // sibling no longer stores were deleted there.
        for record in local.into_iter().flatten() {
            let id = record.id();
            if !stored_ids.contains(&id) && !self.synced.contains(&id) {
                merged.push(record);
            }
        }

        self.records = merged;
    }
}

// ============================================================================
// History Store
// ============================================================================

/// One process's view of the shared history.
///
/// Clones share the same in-memory collection.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<RwLock<HistoryInner>>,
    storage: Arc<dyn SharedStorage>,
    signal: Arc<dyn ChangeSignal>,
    options: HistoryOptions,
    notify: Arc<watch::Sender<u64>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Creates an empty, unloaded store.
    pub fn new(
        storage: Arc<dyn SharedStorage>,
        signal: Arc<dyn ChangeSignal>,
        options: HistoryOptions,
    ) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(HistoryInner::default())),
            storage,
            signal,
            options,
            notify: Arc::new(notify),
        }
    }

    /// Creates a store and hydrates it from shared storage.
    pub async fn open(
        storage: Arc<dyn SharedStorage>,
        signal: Arc<dyn ChangeSignal>,
        options: HistoryOptions,
    ) -> Self {
        let store = Self::new(storage, signal, options);
        store.load().await;
        store
    }

    /// Returns the options this store was built with.
    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    async fn read_stored(&self) -> Result<Option<Envelope>, StoreError> {
        match self.storage.read_bytes(&self.options.key).await? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Brings the in-memory collection up to the stored one.
    ///
    /// A stored revision no newer than ours is ignored. Local changes not
    /// yet saved survive the reload. Missing, unreadable, or corrupt data
    /// yields an empty collection. Returns the number of records held.
    #[instrument(skip(self), fields(key = %self.options.key))]
    pub async fn load(&self) -> usize {
        let (count, revision) = {
            // Held across the read so a concurrent save cannot land between
            // the read and the install.
            let mut inner = self.inner.write().await;
            let (records, revision) = match self.read_stored().await {
                Ok(Some(envelope)) => (dedupe(envelope.records), envelope.revision),
                Ok(None) => {
                    debug!("No stored history, starting empty");
                    (Vec::new(), 0)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load history, starting empty");
                    (Vec::new(), 0)
                }
            };

            if revision > 0 && revision <= inner.revision {
                debug!(revision, ours = inner.revision, "Stored history not newer, keeping ours");
                return inner.records.len();
            }
            inner.install(records, revision);
            (inner.records.len(), revision)
        };
        self.notify_change();
        debug!(count, revision, "History loaded");
        count
    }

    /// Writes `inner` under the caller's lock and makes it the new sync
    /// point.
    #[instrument(skip(self, inner), fields(key = %self.options.key, policy = %self.options.policy))]
    async fn write_locked(&self, inner: &mut HistoryInner) -> Result<u64, StoreError> {
        let stored = match self.read_stored().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Stored history unreadable, overwriting");
                None
            }
        };
        let stored_revision = stored.as_ref().map_or(0, |s| s.revision);

        if self.options.policy == ConflictPolicy::MergeByRevision {
            if let Some(stored) = stored.filter(|s| s.revision != inner.revision) {
                info!(
                    ours = inner.revision,
                    theirs = stored.revision,
                    "Merging concurrent history write"
                );
                inner.merge_from(dedupe(stored.records));
            }
        }

        let revision = stored_revision.max(inner.revision) + 1;
        let bytes = serde_json::to_vec(&EnvelopeRef {
            revision,
            records: &inner.records,
        })?;
        self.storage.write_bytes(&self.options.key, &bytes).await?;
        inner.reset_sync(revision);
        debug!(revision, count = inner.records.len(), "History saved");
        Ok(revision)
    }

    async fn announce(&self) {
        if let Err(e) = self.signal.post(&self.options.channel).await {
            warn!(error = %e, channel = %self.options.channel, "Failed to post change signal");
        }
    }

    /// Persists the in-memory collection and signals sibling processes.
    ///
    /// Returns the new stored revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be serialized or written.
    /// A failed signal post is only logged.
    pub async fn save(&self) -> Result<u64, StoreError> {
        let revision = {
            let mut inner = self.inner.write().await;
            self.write_locked(&mut inner).await?
        };
        self.notify_change();
        self.announce().await;
        Ok(revision)
    }

    /// Applies `f` and saves under one lock, so no reload can slip in
    /// between the change and its write. `None` from `f` skips the save.
    async fn commit<T, F>(&self, f: F) -> Result<Option<(T, u64)>, StoreError>
    where
        F: FnOnce(&mut HistoryInner) -> Option<T>,
    {
        let (value, written) = {
            let mut inner = self.inner.write().await;
            let Some(value) = f(&mut inner) else {
                return Ok(None);
            };
            let written = self.write_locked(&mut inner).await;
            (value, written)
        };
        // The in-memory change stands even when the write failed.
        self.notify_change();
        let revision = written?;
        self.announce().await;
        Ok(Some((value, revision)))
    }

    /// Replaces the in-memory collection with `records` and saves it.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn save_snapshot(&self, records: Vec<CodeRecord>) -> Result<u64, StoreError> {
        let saved = self
            .commit(|inner| {
                inner.replace_all(records);
                Some(())
            })
            .await?;
        Ok(saved.map_or(0, |((), revision)| revision))
    }

    /// Reloads after a sibling process signalled a change.
    pub async fn on_external_change(&self) {
        info!("External history change, reloading");
        self.load().await;
    }

    /// Reloads on every signal from sibling processes until the signal
    /// source goes away.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be observed.
    pub fn spawn_external_sync(&self) -> Result<JoinHandle<()>, StoreError> {
        let mut rx = self.signal.subscribe(&self.options.channel)?;
        let store = self.clone();
        Ok(tokio::spawn(async move {
            while rx.recv().await.is_some() {
                store.on_external_change().await;
            }
            debug!("External sync stopped");
        }))
    }

    // ========================================================================
    // In-Memory Mutation
    // ========================================================================

    /// Adds a record. Call [`HistoryStore::save`] afterwards.
    ///
    /// A record whose id is already present replaces the existing one.
    pub async fn append(&self, record: CodeRecord) {
        self.inner.write().await.upsert(record);
        self.notify_change();
    }

    /// Applies `f` to the record with `id`.
    ///
    /// Returns false (and does nothing) if no such record exists; another
    /// process may have deleted it.
    pub async fn mutate<F>(&self, id: RecordId, f: F) -> bool
    where
        F: FnOnce(&mut CodeRecord),
    {
        let found = self.inner.write().await.mutate(id, f).is_some();
        if found {
            self.notify_change();
        } else {
            debug!(id = %id, "Mutate target not found");
        }
        found
    }

    /// Removes the record with `id`. Returns false if it was not present.
    pub async fn remove(&self, id: RecordId) -> bool {
        let removed = self.inner.write().await.remove(id);
        if removed {
            self.notify_change();
        } else {
            debug!(id = %id, "Remove target not found");
        }
        removed
    }

    // ========================================================================
    // Mutate + Save
    // ========================================================================

    /// Appends `record` and saves.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn add(&self, record: CodeRecord) -> Result<u64, StoreError> {
        let saved = self
            .commit(|inner| {
                inner.upsert(record);
                Some(())
            })
            .await?;
        Ok(saved.map_or(0, |((), revision)| revision))
    }

    /// Flips the pin of `id` and saves. Returns the new pin state, or `None`
    /// if the record is gone.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn toggle_pin(&self, id: RecordId) -> Result<Option<bool>, StoreError> {
        let saved = self
            .commit(|inner| inner.mutate(id, CodeRecord::toggle_pin))
            .await?;
        if saved.is_none() {
            debug!(id = %id, "Pin target not found");
        }
        Ok(saved.map(|(pinned, _)| pinned))
    }

    /// Edits the text of `id`, re-rendering its image, and saves. Returns
    /// false if the record is gone.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn edit(
        &self,
        id: RecordId,
        text: impl Into<String>,
        renderer: &dyn QrRenderer,
    ) -> Result<bool, StoreError> {
        let text = text.into();
        let saved = self
            .commit(|inner| inner.mutate(id, |r| r.edit_text(text, renderer)))
            .await?;
        if saved.is_none() {
            debug!(id = %id, "Edit target not found");
        }
        Ok(saved.is_some())
    }

    /// Removes `id` and saves. Returns false if it was not present.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        let saved = self
            .commit(|inner| inner.remove(id).then_some(()))
            .await?;
        if saved.is_none() {
            debug!(id = %id, "Delete target not found");
        }
        Ok(saved.is_some())
    }

    /// Removes every record and saves.
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::save`].
    pub async fn clear(&self) -> Result<u64, StoreError> {
        self.save_snapshot(Vec::new()).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns the collection in stored order.
    pub async fn records(&self) -> Vec<CodeRecord> {
        self.inner.read().await.records.clone()
    }

    /// Returns the collection newest first, optionally with pinned records
    /// ahead of the rest.
    pub async fn sorted(&self, pinned_first: bool) -> Vec<CodeRecord> {
        let mut records = self.records().await;
        records.sort_by(|a, b| {
            let pin = if pinned_first {
                b.is_pinned().cmp(&a.is_pinned())
            } else {
                std::cmp::Ordering::Equal
            };
            pin.then_with(|| b.created_at().cmp(&a.created_at()))
        });
        records
    }

    /// Returns the record with `id`.
    pub async fn get(&self, id: RecordId) -> Option<CodeRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns true if there are no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Returns the stored revision as of the last load or save.
    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    // ========================================================================
    // Observable
    // ========================================================================

    /// Subscribes to in-memory changes (local edits and reloads).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }
}
