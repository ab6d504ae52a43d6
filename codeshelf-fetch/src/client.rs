//! Isolated HTTP sessions.
//!
//! Each [`HttpClient`] owns its own connection pool and has no cookie jar,
//! so nothing a shortener sets on one lookup can be replayed on the next.
//! Redirects are never followed automatically; the resolver does that so it
//! can rewrite every hop.

use reqwest::{Client, Response, redirect::Policy};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent string for CodeShelf.
const USER_AGENT: &str = concat!("CodeShelf/", env!("CARGO_PKG_VERSION"));

/// Single-use HTTP session.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a session with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a session with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { inner: client })
    }

    /// Performs a GET request. The body is not read.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        debug!("GET request");
        let response = self.inner.get(url.clone()).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}
