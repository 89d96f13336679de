//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Largest fan-out accepted for per-agency location fetches.
const MAX_FETCH_CONCURRENCY: usize = 64;

/// Longest accepted delay before the first scheduled refresh: one day.
const MAX_INITIAL_REFRESH_DELAY_SECS: u64 = 86_400;

/// Configuration validation errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `fetch_concurrency` is 0 or exceeds 64
    /// - `user_agent` is empty
    /// - `agencies_url` or `token_url` is set but is not an http(s) URL
    /// - `initial_refresh_delay_secs` exceeds one day
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch_concurrency".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.fetch_concurrency > MAX_FETCH_CONCURRENCY {
            return Err(ConfigError::Invalid {
                field: "fetch_concurrency".into(),
                reason: format!("must not exceed {MAX_FETCH_CONCURRENCY}"),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        validate_url("agencies_url", self.agencies_url.as_deref())?;
        validate_url("token_url", self.token_url.as_deref())?;

        if self.initial_refresh_delay_secs > MAX_INITIAL_REFRESH_DELAY_SECS {
            return Err(ConfigError::Invalid {
                field: "initial_refresh_delay_secs".into(),
                reason: format!("must not exceed {MAX_INITIAL_REFRESH_DELAY_SECS}"),
            });
        }
        if self.initial_refresh_delay_secs == 0 {
            tracing::warn!("initial_refresh_delay_secs is 0; first refresh fires immediately after warm start");
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: Option<&str>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };

    let url = Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid { field: field.into(), reason: format!("unsupported scheme: {other}") }),
    }
}
