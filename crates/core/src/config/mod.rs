//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FRANCHISE_*)
//! 2. TOML config file (if FRANCHISE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Secrets (TTL, manual overrides, upstream credentials) are deliberately not
//! part of this struct; they are resolved at runtime through a
//! [`SecretLookup`](crate::secrets::SecretLookup).

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FRANCHISE_*)
/// 2. TOML config file (if FRANCHISE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// First page of the upstream agency directory.
    ///
    /// Set via FRANCHISE_AGENCIES_URL environment variable.
    #[serde(default)]
    pub agencies_url: Option<String>,

    /// Password-grant token endpoint of the upstream directory.
    ///
    /// Set via FRANCHISE_TOKEN_URL environment variable.
    #[serde(default)]
    pub token_url: Option<String>,

    /// Path to the SQLite database holding the index snapshot.
    ///
    /// Set via FRANCHISE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests.
    ///
    /// Set via FRANCHISE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via FRANCHISE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of per-agency location fetches in flight.
    ///
    /// Set via FRANCHISE_FETCH_CONCURRENCY environment variable.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Delay before the first scheduled refresh, in seconds.
    ///
    /// Set via FRANCHISE_INITIAL_REFRESH_DELAY_SECS environment variable.
    #[serde(default = "default_initial_refresh_delay_secs")]
    pub initial_refresh_delay_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./franchise-cache.sqlite")
}

fn default_user_agent() -> String {
    "franchise-resolver/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_fetch_concurrency() -> usize {
    crate::directory::DEFAULT_FETCH_CONCURRENCY
}

fn default_initial_refresh_delay_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agencies_url: None,
            token_url: None,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            fetch_concurrency: default_fetch_concurrency(),
            initial_refresh_delay_secs: default_initial_refresh_delay_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before the first scheduled refresh.
    pub fn initial_refresh_delay(&self) -> Duration {
        Duration::from_secs(self.initial_refresh_delay_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FRANCHISE_`
    /// 2. TOML file from `FRANCHISE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FRANCHISE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        // FRANCHISE_SECRET_* belongs to the environment secret store, not to config.
        figment = figment.merge(
            Env::prefixed("FRANCHISE_")
                .ignore(&["CONFIG_FILE"])
                .filter(|key| !key.as_str().to_ascii_lowercase().starts_with("secret_"))
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Agency directory URL (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the agencies URL is not set.
    pub fn require_agencies_url(&self) -> Result<&str, ConfigError> {
        self.agencies_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "agencies_url".into(),
            hint: "Set FRANCHISE_AGENCIES_URL environment variable".into(),
        })
    }

    /// Token endpoint URL (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token URL is not set.
    pub fn require_token_url(&self) -> Result<&str, ConfigError> {
        self.token_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "token_url".into(),
            hint: "Set FRANCHISE_TOKEN_URL environment variable".into(),
        })
    }
}
