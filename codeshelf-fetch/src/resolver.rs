//! Redirect resolution with per-hop sanitizing.
//!
//! The resolver requests the starting URL, and for every redirect it reads
//! the `Location` header, resolves it against the current URL, strips
//! tracking parameters, and only then requests the rewritten target. The
//! result is the last URL that did not redirect.

use async_trait::async_trait;
use codeshelf_core::TrackingFilter;
use reqwest::header::LOCATION;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::client::{DEFAULT_TIMEOUT_SECS, HttpClient};
use crate::error::FetchError;

/// Default maximum number of redirects followed.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

// ============================================================================
// Config
// ============================================================================

/// Settings for a [`RedirectResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound for the whole chain, all hops included.
    pub timeout: Duration,
    /// Maximum number of redirects followed before giving up.
    pub max_redirects: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ResolverConfig {
    /// Sets the chain timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the redirect limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Outcome of following a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The sanitized URL that ended the chain.
    pub final_url: Url,
    /// Every sanitized hop that was requested after the start, in order.
    pub hops: Vec<Url>,
}

/// Anything that can turn a web URL into its final destination.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolves `url` to its final, sanitized destination.
    async fn resolve(&self, url: &Url) -> Result<Url, FetchError>;
}

// ============================================================================
// Redirect Resolver
// ============================================================================

/// Follows HTTP redirects, sanitizing every hop.
#[derive(Debug, Clone, Default)]
pub struct RedirectResolver {
    filter: TrackingFilter,
    config: ResolverConfig,
}

impl RedirectResolver {
    /// Creates a resolver with the built-in tracking deny-list.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            filter: TrackingFilter::new(),
            config,
        }
    }

    /// Replaces the tracking filter.
    #[must_use]
    pub fn with_filter(mut self, filter: TrackingFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Follows the chain starting at `start`.
    ///
    /// A fresh session is created for the call and dropped when it returns.
    ///
    /// # Errors
    ///
    /// Fails on network errors, on timeout, on an unparseable `Location`,
    /// or when the redirect limit is exceeded.
    #[instrument(skip(self), fields(start = %start))]
    pub async fn follow(&self, start: &Url) -> Result<Resolution, FetchError> {
        if !is_web(start) {
            return Err(FetchError::UnsupportedScheme(start.scheme().to_string()));
        }

        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.follow_chain(start)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs_f32(), "Redirect chain timed out");
                Err(FetchError::Timeout(timeout))
            }
        }
    }

    async fn follow_chain(&self, start: &Url) -> Result<Resolution, FetchError> {
        let client = HttpClient::with_timeout(self.config.timeout)?;

        let mut current = start.clone();
        self.filter.strip_url(&mut current);
        let mut hops = Vec::new();

        loop {
            let response = client.get(&current).await?;
            let status = response.status();

            if !status.is_redirection() {
                info!(final_url = %current, hops = hops.len(), "Resolved link");
                return Ok(Resolution {
                    final_url: current,
                    hops,
                });
            }

            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                debug!(status = %status, "Redirect status without Location, stopping");
                return Ok(Resolution {
                    final_url: current,
                    hops,
                });
            };

            let mut next = current
                .join(location)
                .map_err(|e| FetchError::InvalidUrl(format!("{location}: {e}")))?;
            if self.filter.strip_url(&mut next) {
                debug!(hop = hops.len() + 1, "Stripped tracking parameters from hop");
            }

            if hops.len() >= self.config.max_redirects {
                return Err(FetchError::TooManyRedirects(self.config.max_redirects));
            }
            hops.push(next.clone());

            if !is_web(&next) {
                // App-store or other app links end the chain without a fetch.
                info!(final_url = %next, "Redirected to non-web scheme");
                return Ok(Resolution {
                    final_url: next,
                    hops,
                });
            }

            debug!(hop = hops.len(), url = %next, "Following redirect");
            current = next;
        }
    }
}

#[async_trait]
impl LinkResolver for RedirectResolver {
    async fn resolve(&self, url: &Url) -> Result<Url, FetchError> {
        self.follow(url).await.map(|r| r.final_url)
    }
}

fn is_web(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
