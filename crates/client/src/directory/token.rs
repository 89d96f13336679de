//! Bearer tokens for the directory API.
//!
//! Tokens come from an OAuth2 password grant against the configured token
//! URL. Credentials are read from the secret store on every grant, so a
//! rotated password takes effect after the cached token is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;

use franchise_core::cache::TtlCell;
use franchise_core::{Error, FetchError, SecretLookup};

use super::retry::RetryPolicy;
use super::send_error;

pub const CLIENT_ID_SECRET: &str = "directory-client-id";
pub const CLIENT_SECRET_SECRET: &str = "directory-client-secret";
pub const USERNAME_SECRET: &str = "directory-username";
pub const PASSWORD_SECRET: &str = "directory-password";

/// How long a granted token is reused: 30 days.
pub const TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Source of bearer tokens for directory requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, FetchError>;

    /// Drop any cached token; the next call to [`token`](Self::token) fetches a new one.
    async fn invalidate(&self) {}
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Password-grant token provider with a cached token.
pub struct BearerTokenProvider {
    http: Client,
    token_url: String,
    secrets: Arc<dyn SecretLookup>,
    retry: RetryPolicy,
    cached: TtlCell<String>,
}

impl std::fmt::Debug for BearerTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenProvider")
            .field("token_url", &self.token_url)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

impl BearerTokenProvider {
    pub fn new(http: Client, token_url: impl Into<String>, secrets: Arc<dyn SecretLookup>) -> Self {
        Self { http, token_url: token_url.into(), secrets, retry: RetryPolicy::default(), cached: TtlCell::new() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for BearerTokenProvider {
    async fn token(&self) -> Result<String, FetchError> {
        let http = self.http.clone();
        let token_url = self.token_url.clone();
        let secrets = Arc::clone(&self.secrets);
        let retry = self.retry;

        self.cached
            .get_or_populate(Some(TOKEN_TTL), move || request_token(http, token_url, secrets, retry))
            .await
            .map_err(|e| match e {
                Error::Fetch(e) => e,
                other => FetchError::Auth(other.to_string()),
            })
    }

    async fn invalidate(&self) {
        self.cached.remove();
    }
}

async fn required_secret(secrets: &dyn SecretLookup, name: &str) -> Result<String, FetchError> {
    secrets
        .get_secret(name)
        .await
        .ok_or_else(|| FetchError::Auth(format!("secret {name} is not set")))
}

async fn request_token(
    http: Client, token_url: String, secrets: Arc<dyn SecretLookup>, retry: RetryPolicy,
) -> Result<String, Error> {
    let client_id = required_secret(secrets.as_ref(), CLIENT_ID_SECRET).await?;
    let client_secret = required_secret(secrets.as_ref(), CLIENT_SECRET_SECRET).await?;
    let username = required_secret(secrets.as_ref(), USERNAME_SECRET).await?;
    let password = required_secret(secrets.as_ref(), PASSWORD_SECRET).await?;

    let form = [
        ("grant_type", "password"),
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("username", username.as_str()),
        ("password", password.as_str()),
    ];

    let bytes = retry.run(&token_url, || grant(&http, &token_url, &form)).await.map_err(|e| match e {
        FetchError::Status { status, .. } => FetchError::Auth(format!("token endpoint returned HTTP {status}")),
        other => other,
    })?;

    let body: TokenResponse = serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::Auth(format!("unreadable token response: {e}")))?;

    if body.access_token.is_empty() {
        return Err(FetchError::Auth("token endpoint returned an empty access_token".into()).into());
    }

    tracing::info!(token_url = %token_url, "obtained directory bearer token");
    Ok(body.access_token)
}

async fn grant(http: &Client, token_url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
    let response = http
        .post(token_url)
        .header(header::ACCEPT, "application/json")
        .form(form)
        .send()
        .await
        .map_err(|e| send_error(token_url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { url: token_url.to_string(), status: status.as_u16() });
    }

    let bytes = response.bytes().await.map_err(|e| send_error(token_url, &e))?;
    Ok(bytes.to_vec())
}

/// Fixed token, for tests and for deployments that inject one directly.
#[derive(Debug)]
pub struct StaticToken {
    token: String,
    invalidations: AtomicUsize,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), invalidations: AtomicUsize::new(0) }
    }

    /// How many times a caller asked to drop this token.
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, FetchError> {
        Ok(self.token.clone())
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryConfig, http_client};
    use crate::testing::{serve_once, serve_sequence};
    use franchise_core::MemorySecrets;

    fn secrets() -> MemorySecrets {
        MemorySecrets::new()
            .with(CLIENT_ID_SECRET, "cid")
            .with(CLIENT_SECRET_SECRET, "csecret")
            .with(USERNAME_SECRET, "svc@example.com")
            .with(PASSWORD_SECRET, "p&ss")
    }

    fn provider(url: &str, secrets: MemorySecrets) -> BearerTokenProvider {
        let http = http_client(&DirectoryConfig::default()).unwrap();
        BearerTokenProvider::new(http, url, Arc::new(secrets)).with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_password_grant() {
        let (url, request) = serve_once("200 OK", r#"{"access_token":"abc","token_type":"Bearer"}"#).await;
        let provider = provider(&url, secrets());

        assert_eq!(provider.token().await.unwrap(), "abc");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST "));
        assert!(request.to_ascii_lowercase().contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.contains("grant_type=password"));
        assert!(request.contains("client_id=cid"));
        assert!(request.contains("username=svc%40example.com"));
        assert!(request.contains("password=p%26ss"));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let (url, _request) = serve_once("200 OK", r#"{"access_token":"abc"}"#).await;
        let provider = provider(&url, secrets());

        assert_eq!(provider.token().await.unwrap(), "abc");
        // the test server has already shut down; a second grant would fail
        assert_eq!(provider.token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_missing_secret_is_auth_error() {
        let provider = provider("http://127.0.0.1:9/token", MemorySecrets::new().with(CLIENT_ID_SECRET, "cid"));

        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, FetchError::Auth(msg) if msg.contains(CLIENT_SECRET_SECRET)));
    }

    #[tokio::test]
    async fn test_rejected_grant_is_auth_error() {
        let (url, _request) = serve_once("400 Bad Request", r#"{"error":"invalid_grant"}"#).await;
        let provider = provider(&url, secrets());

        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, FetchError::Auth(msg) if msg.contains("400")));
    }

    #[tokio::test]
    async fn test_unavailable_token_endpoint_is_retried() {
        let (url, requests) =
            serve_sequence(&[("503 Service Unavailable", ""), ("200 OK", r#"{"access_token":"abc"}"#)]).await;
        let retry = RetryPolicy { retries: 2, delay: Duration::from_millis(10) };
        let provider = provider(&url, secrets()).with_retry(retry);

        assert_eq!(provider.token().await.unwrap(), "abc");
        assert_eq!(requests.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_grant() {
        let (url, _request) = serve_once("200 OK", r#"{"access_token":"first"}"#).await;
        let provider = provider(&url, secrets());
        assert_eq!(provider.token().await.unwrap(), "first");

        provider.invalidate().await;

        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken::new("fixed");
        assert_eq!(token.token().await.unwrap(), "fixed");
        token.invalidate().await;
        assert_eq!(token.invalidations(), 1);
    }
}
