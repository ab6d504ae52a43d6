//! Scan and share pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use codeshelf_core::{CodeRecord, GeoPoint, Provenance};
use codeshelf_fetch::{FetchError, LinkResolver, RedirectResolver, ResolverConfig};
use codeshelf_store::{HistoryOptions, HistoryStore, MemoryStorage, SignalBus};
use httpmock::prelude::*;
use tokio::sync::{Notify, broadcast};
use tokio::time::timeout;
use url::Url;

use crate::events::ScanEvent;
use crate::location::{DeniedLocation, FixedLocation};
use crate::opener::KnownSchemes;
use crate::pipeline::ScanPipeline;
use crate::recorder::Recorder;
use crate::render::PngRenderer;
use crate::share::ShareIngestPipeline;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Fixtures
// ============================================================================

/// Resolves a fixed set of short links.
struct TableResolver {
    table: Vec<(&'static str, &'static str)>,
    calls: AtomicUsize,
}

impl TableResolver {
    fn new(table: Vec<(&'static str, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            table,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LinkResolver for TableResolver {
    async fn resolve(&self, url: &Url) -> Result<Url, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let target = self
            .table
            .iter()
            .find(|(from, _)| *from == url.as_str())
            .map_or(url.as_str(), |(_, to)| *to);
        Ok(Url::parse(target)?)
    }
}

struct FailingResolver;

#[async_trait]
impl LinkResolver for FailingResolver {
    async fn resolve(&self, _url: &Url) -> Result<Url, FetchError> {
        Err(FetchError::Timeout(Duration::from_secs(10)))
    }
}

/// Blocks until released, then resolves to the input.
struct GatedResolver {
    gate: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl LinkResolver for GatedResolver {
    async fn resolve(&self, url: &Url) -> Result<Url, FetchError> {
        self.gate.notified().await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(url.clone())
    }
}

async fn history(storage: &MemoryStorage, bus: &SignalBus) -> HistoryStore {
    HistoryStore::open(
        Arc::new(storage.clone()),
        Arc::new(bus.endpoint()),
        HistoryOptions::default(),
    )
    .await
}

fn opener() -> Arc<KnownSchemes> {
    Arc::new(KnownSchemes::new(["tel", "mailto", "spotify"]))
}

async fn next_matching<F>(rx: &mut broadcast::Receiver<ScanEvent>, pred: F) -> ScanEvent
where
    F: Fn(&ScanEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

async fn next_record(rx: &mut broadcast::Receiver<ScanEvent>) -> CodeRecord {
    match next_matching(rx, |e| matches!(e, ScanEvent::Recorded(_))).await {
        ScanEvent::Recorded(record) => record,
        _ => unreachable!(),
    }
}

// ============================================================================
// Scan Pipeline
// ============================================================================

#[tokio::test]
async fn test_short_link_recorded_as_resolved_destination() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = TableResolver::new(vec![(
        "https://bit.ly/demo",
        "https://example.com/page?utm_source=qr",
    )]);
    let session = ScanPipeline::new(Recorder::new(store.clone()), resolver, opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("https://bit.ly/demo").await.unwrap();
    let record = next_record(&mut events).await;

    assert_eq!(record.original_text(), "https://bit.ly/demo");
    assert_eq!(record.display_text(), "https://example.com/page");
    assert!(record.was_scanned());
    assert_eq!(store.len().await, 1);
    session.stop().await;
}

#[tokio::test]
async fn test_redirect_chain_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/demo");
            then.status(302)
                .header("Location", "/page?utm_source=qr&fbclid=abc");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/page");
            then.status(200).body("ok");
        })
        .await;

    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = Arc::new(RedirectResolver::new(ResolverConfig::default()));
    let session = ScanPipeline::new(Recorder::new(store.clone()), resolver, opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded(server.url("/demo")).await.unwrap();
    let record = next_record(&mut events).await;

    assert_eq!(record.original_text(), server.url("/demo"));
    assert_eq!(record.display_text(), server.url("/page"));
    session.stop().await;
}

#[tokio::test]
async fn test_plain_text_recorded_verbatim() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = TableResolver::new(vec![]);
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), resolver.clone(), opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("hello world").await.unwrap();
    let record = next_record(&mut events).await;

    assert_eq!(record.display_text(), "hello world");
    assert_eq!(record.original_text(), "hello world");
    assert!(record.was_scanned());
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    session.stop().await;
}

#[tokio::test]
async fn test_deep_link_skips_resolution() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = TableResolver::new(vec![]);
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), resolver.clone(), opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("tel:+15551234567").await.unwrap();
    let record = next_record(&mut events).await;

    assert_eq!(record.display_text(), "tel:+15551234567");
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    session.stop().await;
}

#[tokio::test]
async fn test_without_resolution_strips_only() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = TableResolver::new(vec![]);
    let session = ScanPipeline::new(Recorder::new(store.clone()), resolver.clone(), opener())
        .without_resolution()
        .start();
    let mut events = session.subscribe();

    session
        .payload_decoded("https://example.com/a?gclid=1&q=2")
        .await
        .unwrap();
    let record = next_record(&mut events).await;

    assert_eq!(record.display_text(), "https://example.com/a?q=2");
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    session.stop().await;
}

#[tokio::test]
async fn test_duplicates_suppressed_until_payload_changes() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), TableResolver::new(vec![]), opener())
            .start();
    let mut events = session.subscribe();

    for payload in ["A", "A", "B", "A"] {
        session.payload_decoded(payload).await.unwrap();
    }

    let mut recorded = Vec::new();
    let mut duplicates = 0;
    while recorded.len() < 3 {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            ScanEvent::Recorded(r) => recorded.push(r.display_text().to_string()),
            ScanEvent::Duplicate { payload } => {
                assert_eq!(payload, "A");
                duplicates += 1;
            }
            _ => {}
        }
    }

    assert_eq!(recorded, ["A", "B", "A"]);
    assert_eq!(duplicates, 1);
    assert_eq!(store.len().await, 3);
    session.stop().await;
}

#[tokio::test]
async fn test_resolution_failure_records_nothing() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), Arc::new(FailingResolver), opener())
            .start();
    let mut events = session.subscribe();

    session.payload_decoded("https://bit.ly/gone").await.unwrap();
    let event = next_matching(&mut events, |e| {
        matches!(e, ScanEvent::ResolutionFailed { .. })
    })
    .await;
    if let ScanEvent::ResolutionFailed { payload, reason } = event {
        assert_eq!(payload, "https://bit.ly/gone");
        assert!(reason.contains("timed out") || reason.contains("Timeout"));
    }

    // The failed payload stays consumed.
    session.payload_decoded("https://bit.ly/gone").await.unwrap();
    next_matching(&mut events, |e| matches!(e, ScanEvent::Duplicate { .. })).await;

    assert!(store.is_empty().await);
    session.stop().await;
}

#[tokio::test]
async fn test_decode_failure_is_reported() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), TableResolver::new(vec![]), opener())
            .start();
    let mut events = session.subscribe();

    session.decode_failed().await.unwrap();
    next_matching(&mut events, |e| matches!(e, ScanEvent::DecodeFailed)).await;
    assert!(store.is_empty().await);
    session.stop().await;
}

#[tokio::test]
async fn test_late_resolution_after_stop_is_discarded() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = Arc::new(GatedResolver {
        gate: Notify::new(),
        finished: AtomicBool::new(false),
    });
    let session =
        ScanPipeline::new(Recorder::new(store.clone()), resolver.clone(), opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("https://bit.ly/slow").await.unwrap();
    next_matching(&mut events, |e| matches!(e, ScanEvent::Resolving { .. })).await;

    session.stop().await;
    resolver.gate.notify_one();

    timeout(WAIT, async {
        while !resolver.finished.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_flush_waits_for_resolutions() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let resolver = TableResolver::new(vec![
        ("https://bit.ly/a", "https://example.com/a"),
        ("https://bit.ly/b", "https://example.com/b"),
    ]);
    let session = ScanPipeline::new(Recorder::new(store.clone()), resolver, opener()).start();

    session.payload_decoded("https://bit.ly/a").await.unwrap();
    session.payload_decoded("note").await.unwrap();
    session.payload_decoded("https://bit.ly/b").await.unwrap();
    timeout(WAIT, session.flush()).await.unwrap().unwrap();

    assert_eq!(store.len().await, 3);
    session.stop().await;
}

#[tokio::test]
async fn test_location_attached_when_available() {
    let point = GeoPoint::new(48.8566, 2.3522);
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let recorder = Recorder::new(store).with_location(Arc::new(FixedLocation(point)));
    let session = ScanPipeline::new(recorder, TableResolver::new(vec![]), opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("hello").await.unwrap();
    assert_eq!(next_record(&mut events).await.scan_location(), Some(point));
    session.stop().await;
}

#[tokio::test]
async fn test_denied_location_still_records() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let recorder = Recorder::new(store.clone()).with_location(Arc::new(DeniedLocation));
    let session = ScanPipeline::new(recorder, TableResolver::new(vec![]), opener()).start();
    let mut events = session.subscribe();

    session.payload_decoded("hello").await.unwrap();
    assert!(next_record(&mut events).await.scan_location().is_none());
    assert_eq!(store.len().await, 1);
    session.stop().await;
}

// ============================================================================
// Share Ingest
// ============================================================================

#[tokio::test]
async fn test_share_ingest_strips_and_renders() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let recorder = Recorder::new(store.clone())
        .with_location(Arc::new(FixedLocation(GeoPoint::new(1.0, 2.0))))
        .with_renderer(Arc::new(PngRenderer::new()));
    let share = ShareIngestPipeline::new(recorder, opener());

    let shared = "look https://example.com/item?utm_campaign=x&id=7";
    let record = share.ingest(shared).await.unwrap();

    assert_eq!(record.provenance(), Provenance::Shared);
    assert_eq!(record.original_text(), shared);
    assert_eq!(record.display_text(), "https://example.com/item?id=7");
    assert!(record.scan_location().is_none());
    assert!(record.image_bytes().unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
    assert_eq!(store.get(record.id()).await.unwrap(), record);
}

#[tokio::test]
async fn test_share_ingest_plain_text() {
    let store = history(&MemoryStorage::new(), &SignalBus::new()).await;
    let share = ShareIngestPipeline::new(Recorder::new(store), opener());

    let record = share.ingest("a note to self").await.unwrap();
    assert_eq!(record.display_text(), "a note to self");
    assert!(record.was_shared());
}

#[tokio::test]
async fn test_share_ingest_reaches_app_process() {
    let storage = MemoryStorage::new();
    let bus = SignalBus::new();
    let app = history(&storage, &bus).await;
    let extension = history(&storage, &bus).await;
    let _sync = app.spawn_external_sync().unwrap();
    let mut changes = app.subscribe();

    let share = ShareIngestPipeline::new(Recorder::new(extension), opener());
    let record = share.ingest("https://example.com/shared").await.unwrap();

    timeout(WAIT, async {
        while app.get(record.id()).await.is_none() {
            changes.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
}
