//! Scan pipeline.
//!
//! A [`ScanSession`] is a task fed by the capture subsystem through a
//! channel. Each decoded payload goes through
//!
//! ```text
//! Detecting -> Classifying -> [Resolving] -> Recording
//! ```
//!
//! Redirect resolution runs in its own task and reports back to the
//! session over a second channel, so the session keeps handling captures
//! while a link resolves. Recording happens on the session task only, one
//! record at a time. Once the session stops, resolutions that finish late
//! have nowhere to report and are dropped.

use codeshelf_core::{
    Observation, PayloadKind, Provenance, ScanDebouncer, SchemeOpener, TrackingFilter,
};
use codeshelf_fetch::{FetchError, LinkResolver};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::{classify, display_text};
use crate::error::ScanError;
use crate::events::ScanEvent;
use crate::recorder::Recorder;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

// ============================================================================
// Pipeline
// ============================================================================

/// Configured scan pipeline. Call [`ScanPipeline::start`] for a session.
#[derive(Clone)]
pub struct ScanPipeline {
    recorder: Recorder,
    resolver: Option<Arc<dyn LinkResolver>>,
    opener: Arc<dyn SchemeOpener>,
    filter: TrackingFilter,
}

impl std::fmt::Debug for ScanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanPipeline")
            .field("recorder", &self.recorder)
            .field("resolves", &self.resolver.is_some())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ScanPipeline {
    /// Creates a pipeline that resolves web links with `resolver`.
    pub fn new(
        recorder: Recorder,
        resolver: Arc<dyn LinkResolver>,
        opener: Arc<dyn SchemeOpener>,
    ) -> Self {
        Self {
            recorder,
            resolver: Some(resolver),
            opener,
            filter: TrackingFilter::new(),
        }
    }

    /// Records web links as scanned (tracking parameters stripped) without
    /// fetching them.
    #[must_use]
    pub fn without_resolution(mut self) -> Self {
        self.resolver = None;
        self
    }

    /// Replaces the tracking filter.
    #[must_use]
    pub fn with_filter(mut self, filter: TrackingFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Starts a scan session. Must be called inside a Tokio runtime.
    pub fn start(&self) -> ScanSession {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (resolved_tx, resolved_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = SessionActor {
            pipeline: self.clone(),
            debouncer: ScanDebouncer::new(),
            events_tx: events_tx.clone(),
            resolved_tx,
            in_flight: 0,
            flush_waiters: Vec::new(),
        };
        let task = tokio::spawn(actor.run(cmd_rx, resolved_rx));
        info!("Scan session started");

        ScanSession {
            cmd_tx,
            events_tx,
            task,
        }
    }
}

// ============================================================================
// Session Handle
// ============================================================================

#[derive(Debug)]
enum Command {
    Decoded(String),
    DecodeFailed,
    Flush(oneshot::Sender<()>),
    Stop,
}

/// Handle to a running scan session.
///
/// Dropping the handle also ends the session.
#[derive(Debug)]
pub struct ScanSession {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<ScanEvent>,
    task: JoinHandle<()>,
}

impl ScanSession {
    /// Feeds a payload decoded by the capture subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Closed`] if the session has stopped.
    pub async fn payload_decoded(&self, payload: impl Into<String>) -> Result<(), ScanError> {
        self.send(Command::Decoded(payload.into())).await
    }

    /// Reports a captured frame with no decodable code.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Closed`] if the session has stopped.
    pub async fn decode_failed(&self) -> Result<(), ScanError> {
        self.send(Command::DecodeFailed).await
    }

    /// Waits until every payload sent so far is recorded or has failed.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Closed`] if the session has stopped.
    pub async fn flush(&self) -> Result<(), ScanError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx)).await?;
        rx.await.map_err(|_| ScanError::Closed)
    }

    async fn send(&self, cmd: Command) -> Result<(), ScanError> {
        self.cmd_tx.send(cmd).await.map_err(|_| ScanError::Closed)
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events_tx.subscribe()
    }

    /// Stops the session after the commands already queued.
    ///
    /// In-flight resolutions keep running but their results are dropped.
    pub async fn stop(self) {
        let _ = self.cmd_tx.send(Command::Stop).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scan session task failed");
        }
        info!("Scan session stopped");
    }
}

// ============================================================================
// Session Task
// ============================================================================

struct Resolved {
    payload: String,
    result: Result<Url, FetchError>,
}

struct SessionActor {
    pipeline: ScanPipeline,
    debouncer: ScanDebouncer,
    events_tx: broadcast::Sender<ScanEvent>,
    resolved_tx: mpsc::Sender<Resolved>,
    in_flight: usize,
    flush_waiters: Vec<oneshot::Sender<()>>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut resolved_rx: mpsc::Receiver<Resolved>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Decoded(payload)) => self.on_decoded(payload).await,
                    Some(Command::DecodeFailed) => {
                        debug!("Frame had no decodable code");
                        self.emit(ScanEvent::DecodeFailed);
                    }
                    Some(Command::Flush(resp)) => {
                        if self.in_flight == 0 {
                            let _ = resp.send(());
                        } else {
                            self.flush_waiters.push(resp);
                        }
                    }
                    Some(Command::Stop) | None => break,
                },
                Some(resolved) = resolved_rx.recv() => self.on_resolved(resolved).await,
            }
        }
    }

    fn emit(&self, event: ScanEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    async fn on_decoded(&mut self, payload: String) {
        if self.debouncer.observe(&payload) == Observation::Duplicate {
            debug!("Duplicate payload suppressed");
            self.emit(ScanEvent::Duplicate { payload });
            return;
        }
        self.emit(ScanEvent::Accepted {
            payload: payload.clone(),
        });

        let kind = classify(&payload, self.pipeline.opener.as_ref());
        debug!(kind = kind.label(), "Classified payload");

        match (kind, self.pipeline.resolver.clone()) {
            (PayloadKind::Web(url), Some(resolver)) => {
                self.spawn_resolution(resolver, url, payload);
            }
            (kind, _) => {
                let display = display_text(&kind, &payload, &self.pipeline.filter);
                self.record(payload, display).await;
            }
        }
    }

    fn spawn_resolution(&mut self, resolver: Arc<dyn LinkResolver>, url: Url, payload: String) {
        self.emit(ScanEvent::Resolving {
            payload: payload.clone(),
        });
        self.in_flight += 1;
        let tx = self.resolved_tx.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&url).await;
            if tx.send(Resolved { payload, result }).await.is_err() {
                debug!(url = %url, "Scan session gone, discarding resolution");
            }
        });
    }

    async fn on_resolved(&mut self, resolved: Resolved) {
        let Resolved { payload, result } = resolved;
        match result {
            Ok(mut url) => {
                self.pipeline.filter.strip_url(&mut url);
                self.record(payload, url.into()).await;
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Link resolution failed");
                self.emit(ScanEvent::ResolutionFailed {
                    payload,
                    reason: e.to_string(),
                });
            }
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            for waiter in self.flush_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    async fn record(&self, payload: String, display: String) {
        match self
            .pipeline
            .recorder
            .record(Provenance::Scanned, &payload, &display)
            .await
        {
            Ok(record) => self.emit(ScanEvent::Recorded(record)),
            Err(e) => {
                warn!(error = %e, "Failed to record scan");
                self.emit(ScanEvent::RecordFailed {
                    payload,
                    reason: e.to_string(),
                });
            }
        }
    }
}
