//! Secret lookup.
//!
//! Secrets are looked up by name at runtime rather than loaded with the rest
//! of the configuration, so they can be rotated by clearing the cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

/// Cache TTL in whole seconds.
pub const CACHE_EXPIRATION_SECRET: &str = "cache-expiration-seconds";

/// JSON array of manual franchise mappings.
pub const MANUAL_OVERRIDES_SECRET: &str = "manual-franchise-overrides";

/// Prefix [`EnvSecrets`] puts in front of every secret name.
pub const DEFAULT_ENV_PREFIX: &str = "FRANCHISE_SECRET_";

/// Named string lookup.
#[async_trait]
pub trait SecretLookup: Send + Sync {
    async fn get_secret(&self, name: &str) -> Option<String>;
}

/// Secrets read from environment variables.
///
/// `cache-expiration-seconds` is read from `FRANCHISE_SECRET_CACHE_EXPIRATION_SECONDS`.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    prefix: String,
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self { prefix: DEFAULT_ENV_PREFIX.to_string() }
    }
}

impl EnvSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Environment variable that holds `name`.
    pub fn var_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretLookup for EnvSecrets {
    async fn get_secret(&self, name: &str) -> Option<String> {
        let var = self.var_name(name);
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => {
                tracing::debug!(secret = name, var = %var, "secret not set");
                None
            }
        }
    }
}

/// In-process secrets, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySecrets {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) {
        self.values.write().unwrap_or_else(PoisonError::into_inner).remove(name);
    }
}

#[async_trait]
impl SecretLookup for MemorySecrets {
    async fn get_secret(&self, name: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        let secrets = EnvSecrets::new();
        assert_eq!(secrets.var_name(CACHE_EXPIRATION_SECRET), "FRANCHISE_SECRET_CACHE_EXPIRATION_SECONDS");
        assert_eq!(secrets.var_name("a.b-c"), "FRANCHISE_SECRET_A_B_C");
    }

    #[tokio::test]
    async fn test_env_secrets_lookup() {
        let secrets = EnvSecrets::with_prefix("FRANCHISE_TEST_SECRET_LOOKUP_");
        let var = secrets.var_name("present");
        unsafe {
            std::env::set_var(&var, "value");
        }

        assert_eq!(secrets.get_secret("present").await.as_deref(), Some("value"));
        assert!(secrets.get_secret("absent").await.is_none());

        unsafe {
            std::env::remove_var(&var);
        }
    }

    #[tokio::test]
    async fn test_memory_secrets() {
        let secrets = MemorySecrets::new().with("a", "1");
        assert_eq!(secrets.get_secret("a").await.as_deref(), Some("1"));

        secrets.remove("a");
        assert!(secrets.get_secret("a").await.is_none());
    }
}
