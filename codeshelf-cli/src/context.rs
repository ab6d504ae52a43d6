//! Wiring from settings to stores and pipelines.

use codeshelf_core::{LocationProvider, QrRenderer, TrackingFilter};
use codeshelf_fetch::{RedirectResolver, ResolverConfig};
use codeshelf_scan::{KnownSchemes, NoLocation, PngRenderer, Recorder};
use codeshelf_store::{FileSignal, FileStorage, HistoryStore, Settings, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, built once from settings.
pub struct AppContext {
    /// The loaded settings store.
    pub settings_store: SettingsStore,
    /// Effective settings, with command-line overrides applied.
    pub settings: Settings,
}

impl AppContext {
    /// Applies command-line overrides on top of stored settings.
    pub async fn new(settings_store: SettingsStore, group_dir: Option<PathBuf>) -> Self {
        let mut settings = settings_store.get().await;
        if group_dir.is_some() {
            settings.group_dir = group_dir;
        }
        debug!(group_dir = %settings.group_dir().display(), "Using group directory");
        Self {
            settings_store,
            settings,
        }
    }

    /// Opens this process's view of the shared history.
    pub async fn history(&self) -> HistoryStore {
        let dir = self.settings.group_dir();
        let signal = FileSignal::new(&dir).with_poll_interval(self.settings.signal_poll_interval());
        HistoryStore::open(
            Arc::new(FileStorage::new(&dir)),
            Arc::new(signal),
            self.settings.history_options(),
        )
        .await
    }

    /// Returns the tracking filter with user additions.
    pub fn filter(&self) -> TrackingFilter {
        TrackingFilter::new().with_extra(&self.settings.extra_tracking_params)
    }

    /// Returns a redirect resolver honoring the configured bounds.
    pub fn resolver(&self) -> RedirectResolver {
        let config = ResolverConfig::default()
            .with_timeout(self.settings.resolve_timeout())
            .with_max_redirects(self.settings.max_redirects);
        RedirectResolver::new(config).with_filter(self.filter())
    }

    /// Returns the scheme opener.
    pub fn opener(&self) -> Arc<KnownSchemes> {
        Arc::new(KnownSchemes::new(&self.settings.openable_schemes))
    }

    /// Returns the image renderer, if image rendering is enabled.
    pub fn renderer(&self) -> Option<Arc<dyn QrRenderer>> {
        self.settings
            .render_images
            .then(|| Arc::new(PngRenderer::new()) as Arc<dyn QrRenderer>)
    }

    /// Returns the renderer for user-created and edited records. With image
    /// rendering disabled, records are stored without an image.
    pub fn edit_renderer(&self) -> Arc<dyn QrRenderer> {
        self.renderer().unwrap_or_else(|| Arc::new(NoImage))
    }

    /// Builds a recorder over `history`.
    ///
    /// `location` is ignored when location recording is disabled.
    pub fn recorder(
        &self,
        history: HistoryStore,
        location: Option<Arc<dyn LocationProvider>>,
    ) -> Recorder {
        let mut recorder = Recorder::new(history);
        if self.settings.record_location {
            recorder = recorder.with_location(location.unwrap_or_else(|| Arc::new(NoLocation)));
        }
        if let Some(renderer) = self.renderer() {
            recorder = recorder.with_renderer(renderer);
        }
        recorder
    }
}

struct NoImage;

impl QrRenderer for NoImage {
    fn render(&self, _text: &str) -> Option<Vec<u8>> {
        None
    }
}
