//! Cross-process change signals.
//!
//! A signal is a fire-and-forget "shared data changed" notice on a named
//! channel. Delivery is best effort: notices are coalesced when a subscriber
//! falls behind, and nothing is queued for processes that are not running.
//! Subscribers never see their own posts.
//!
//! - [`FileSignal`] - Stamp file in the shared group directory, polled
//! - [`LocalSignal`] - Endpoints on an in-process [`SignalBus`]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::error::StoreError;
use crate::persistence::{validate_key, write_atomic};

/// Pending notices kept per subscriber before coalescing.
const SUBSCRIBER_BUFFER: usize = 8;

/// Default poll period for [`FileSignal`] subscribers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Receiving end of a subscription. Drop it to unsubscribe.
pub type SignalReceiver = mpsc::Receiver<()>;

/// Named-channel change notification shared between processes.
#[async_trait]
pub trait ChangeSignal: Send + Sync {
    /// Announces a change on `channel`.
    async fn post(&self, channel: &str) -> Result<(), StoreError>;

    /// Starts observing `channel`. Must be called inside a Tokio runtime.
    fn subscribe(&self, channel: &str) -> Result<SignalReceiver, StoreError>;
}

/// Queues a notice unless one is already waiting.
///
/// Returns false once the subscriber is gone.
fn deliver(tx: &mpsc::Sender<()>) -> bool {
    match tx.try_send(()) {
        Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
        Err(mpsc::error::TrySendError::Closed(())) => false,
    }
}

// ============================================================================
// File Signal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SignalStamp {
    seq: u64,
    sender: Uuid,
}

fn parse_stamp(bytes: &[u8]) -> Option<SignalStamp> {
    serde_json::from_slice(bytes).ok()
}

async fn read_stamp(path: &Path) -> Option<SignalStamp> {
    let bytes = tokio::fs::read(path).await.ok()?;
    parse_stamp(&bytes)
}

/// Own sequence numbers remembered per channel.
const OWN_POST_MEMORY: usize = 64;

/// Sequence numbers an endpoint (and its clones) wrote, per channel.
#[derive(Debug, Clone, Default)]
struct OwnPosts(Arc<Mutex<HashMap<String, VecDeque<u64>>>>);

impl OwnPosts {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<u64>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, channel: &str, seq: u64) {
        let mut posts = self.lock();
        let seqs = posts.entry(channel.to_string()).or_default();
        if seqs.len() == OWN_POST_MEMORY {
            seqs.pop_front();
        }
        seqs.push_back(seq);
    }

    fn forget(&self, channel: &str, seq: u64) {
        if let Some(seqs) = self.lock().get_mut(channel) {
            seqs.retain(|&s| s != seq);
        }
    }

    /// Own posts with a sequence number in `(after, through]`.
    fn count_between(&self, channel: &str, after: u64, through: u64) -> u64 {
        self.lock().get(channel).map_or(0, |seqs| {
            seqs.iter().filter(|&&s| s > after && s <= through).count() as u64
        })
    }
}

/// Signal backed by a stamp file per channel.
///
/// Posting rewrites `<dir>/<channel>.signal` with a bumped sequence number
/// and this endpoint's sender id. Subscribers poll the file. When the stamp
/// moved by more than this endpoint's own posts account for, a sibling
/// posted in between and the change is delivered even though the last
/// writer was us.
#[derive(Debug, Clone)]
pub struct FileSignal {
    dir: PathBuf,
    sender: Uuid,
    poll_interval: Duration,
    own_posts: OwnPosts,
}

impl FileSignal {
    /// Creates an endpoint with a fresh sender id.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sender: Uuid::new_v4(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            own_posts: OwnPosts::default(),
        }
    }

    /// Sets the subscriber poll period.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn stamp_path(&self, channel: &str) -> Result<PathBuf, StoreError> {
        validate_key(channel)?;
        Ok(self.dir.join(format!("{channel}.signal")))
    }
}

#[async_trait]
impl ChangeSignal for FileSignal {
    #[instrument(skip(self), fields(sender = %self.sender))]
    async fn post(&self, channel: &str) -> Result<(), StoreError> {
        let path = self.stamp_path(channel)?;
        let seq = read_stamp(&path).await.map_or(0, |s| s.seq);
        let stamp = SignalStamp {
            seq: seq.wrapping_add(1),
            sender: self.sender,
        };
        let bytes = serde_json::to_vec(&stamp)?;

        // Recorded before the write so a poller never sees our stamp
        // without knowing it is ours.
        self.own_posts.record(channel, stamp.seq);
        if let Err(e) = write_atomic(&path, &bytes).await {
            self.own_posts.forget(channel, stamp.seq);
            return Err(e);
        }
        debug!(seq = stamp.seq, "Posted change signal");
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Result<SignalReceiver, StoreError> {
        let path = self.stamp_path(channel)?;
        let me = self.sender;
        let own_posts = self.own_posts.clone();
        let period = self.poll_interval;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        // Taken before returning so posts made right after subscribing count.
        let mut last = std::fs::read(&path).ok().and_then(|b| parse_stamp(&b));
        let channel = channel.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = tx.closed() => break,
                }
                let current = read_stamp(&path).await;
                if current == last {
                    continue;
                }
                let seen = last.map_or(0, |s| s.seq);
                last = current;
                let Some(stamp) = current else {
                    continue;
                };

                let own = own_posts.count_between(&channel, seen, stamp.seq);
                let foreign = stamp.sender != me || stamp.seq.saturating_sub(seen) > own;
                if !foreign {
                    trace!(channel = %channel, "Ignoring own signal");
                    continue;
                }
                debug!(channel = %channel, seq = stamp.seq, "Observed change signal");
                if !deliver(&tx) {
                    break;
                }
            }
            trace!(channel = %channel, "File signal subscriber stopped");
        });

        Ok(rx)
    }
}

// ============================================================================
// Local Signal
// ============================================================================

/// In-process signal hub. Each [`LocalSignal`] endpoint plays one process.
#[derive(Debug, Clone, Default)]
pub struct SignalBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Uuid>>>>,
}

impl SignalBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new endpoint with its own sender id.
    pub fn endpoint(&self) -> LocalSignal {
        LocalSignal {
            bus: self.clone(),
            sender: Uuid::new_v4(),
        }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Uuid> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
            .clone()
    }
}

/// One endpoint of a [`SignalBus`].
#[derive(Debug, Clone)]
pub struct LocalSignal {
    bus: SignalBus,
    sender: Uuid,
}

#[async_trait]
impl ChangeSignal for LocalSignal {
    async fn post(&self, channel: &str) -> Result<(), StoreError> {
        // No receivers is fine: nobody else is running.
        let _ = self.bus.sender_for(channel).send(self.sender);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Result<SignalReceiver, StoreError> {
        let mut source = self.bus.sender_for(channel).subscribe();
        let me = self.sender;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    received = source.recv() => received,
                    () = tx.closed() => break,
                };
                match received {
                    Ok(from) if from == me => {}
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if !deliver(&tx) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

// ============================================================================
// Tests
// ============================================================================
