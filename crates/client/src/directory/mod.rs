//! HTTP client for the upstream agency directory.
//!
//! ### Requests
//! - `GET` with `Authorization: Bearer <token>` from a [`TokenSource`]
//! - `Cache-Control: no-cache` so intermediaries never serve a stale page
//! - `Accept: application/json` and the configured User-Agent
//!
//! ### Errors
//! - Non-success status: `FetchError::Status`
//! - Request timeout: `FetchError::Timeout`
//! - Anything else on the wire: `FetchError::Network`
//!
//! A `401` also invalidates the cached token so the next refresh re-authenticates.
//! Transient failures are retried per [`RetryPolicy`].

pub mod retry;
pub mod token;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};

use franchise_core::config::AppConfig;
use franchise_core::{FetchError, PageFetcher};

pub use retry::RetryPolicy;
pub use token::{BearerTokenProvider, StaticToken, TokenSource};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "franchise-resolver/0.1";

/// Directory client configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// User-agent string (default: franchise-resolver/0.1).
    pub user_agent: String,
    /// Request timeout (default: 30s).
    pub timeout: Duration,
    /// Retries after a transient failure (default: 2).
    pub retries: u32,
    /// Pause between retries (default: 1s).
    pub retry_delay: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: retry::DEFAULT_RETRIES,
            retry_delay: retry::DEFAULT_RETRY_DELAY,
        }
    }
}

impl DirectoryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { retries: self.retries, delay: self.retry_delay }
    }
}

impl From<&AppConfig> for DirectoryConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Build the HTTP client shared by page and token requests.
pub fn http_client(config: &DirectoryConfig) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .use_rustls_tls()
        .gzip(true)
        .build()
        .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))
}

/// Classify a transport failure.
pub(crate) fn send_error(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network(format!("{url}: {err}"))
    }
}

/// [`PageFetcher`] over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct DirectoryClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient").field("retry", &self.retry).finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: &DirectoryConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, FetchError> {
        Ok(Self::with_http(http_client(config)?, tokens).with_retry(config.retry_policy()))
    }

    /// Create a client on an existing HTTP client, with the default retry policy.
    pub fn with_http(http: Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self { http, tokens, retry: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let token = self.tokens.token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| send_error(url, &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(url, "directory rejected bearer token; invalidating it");
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(|e| send_error(url, &e))?;

        tracing::debug!(url, size = bytes.len(), elapsed_ms = start.elapsed().as_millis() as u64, "fetched directory page");

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageFetcher for DirectoryClient {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.retry.run(url, || self.fetch_once(url)).await
    }
}
