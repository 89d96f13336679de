//! Cache lifetime resolution.
//!
//! The TTL comes from the `cache-expiration-seconds` secret and is cached
//! without expiry until the cache is cleared. The refresh interval is half of it.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::FranchiseCache;
use crate::secrets::{CACHE_EXPIRATION_SECRET, SecretLookup};

/// TTL used when the secret is absent or not an integer: 12 hours.
pub const DEFAULT_TTL_SECONDS: i64 = 43_200;

/// Parse a TTL secret value, falling back to [`DEFAULT_TTL_SECONDS`].
pub fn parse_ttl_seconds(raw: Option<&str>) -> i64 {
    match raw.map(str::trim) {
        Some(value) => match value.parse::<i64>() {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!(value, error = %e, default = DEFAULT_TTL_SECONDS, "cache TTL is not an integer");
                DEFAULT_TTL_SECONDS
            }
        },
        None => DEFAULT_TTL_SECONDS,
    }
}

/// Refresh interval in seconds for a TTL; integer division, so a TTL of 1 gives 0.
pub fn refresh_occurrence(ttl_seconds: i64) -> i64 {
    ttl_seconds / 2
}

/// TTL as a duration; negative values clamp to zero.
pub fn ttl_duration(ttl_seconds: i64) -> Duration {
    u64::try_from(ttl_seconds).map(Duration::from_secs).unwrap_or(Duration::ZERO)
}

/// Resolve the TTL, reading the secret on first use and caching it after.
pub async fn resolve_ttl_seconds<S>(cache: &FranchiseCache, secrets: &Arc<S>) -> i64
where
    S: SecretLookup + ?Sized + 'static,
{
    let secrets = Arc::clone(secrets);
    let resolved = cache
        .ttl_seconds
        .get_or_populate(None, move || async move {
            let raw = secrets.get_secret(CACHE_EXPIRATION_SECRET).await;
            Ok(parse_ttl_seconds(raw.as_deref()))
        })
        .await;

    match resolved {
        Ok(secs) => secs,
        Err(e) => {
            tracing::warn!(error = %e, default = DEFAULT_TTL_SECONDS, "failed to resolve cache TTL");
            DEFAULT_TTL_SECONDS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecrets;

    #[test]
    fn test_absent_uses_default() {
        let ttl = parse_ttl_seconds(None);
        assert_eq!(ttl, 43_200);
        assert_eq!(refresh_occurrence(ttl), 21_600);
    }

    #[test]
    fn test_non_numeric_uses_default() {
        assert_eq!(parse_ttl_seconds(Some("twelve hours")), DEFAULT_TTL_SECONDS);
        assert_eq!(parse_ttl_seconds(Some("")), DEFAULT_TTL_SECONDS);
        assert_eq!(parse_ttl_seconds(Some("1.5")), DEFAULT_TTL_SECONDS);
    }

    #[test]
    fn test_parse_trims() {
        assert_eq!(parse_ttl_seconds(Some(" 600\n")), 600);
    }

    #[test]
    fn test_small_ttl_has_no_interval() {
        assert_eq!(refresh_occurrence(1), 0);
        assert_eq!(refresh_occurrence(0), 0);
        assert!(refresh_occurrence(-10) <= 0);
        assert_eq!(refresh_occurrence(3), 1);
    }

    #[test]
    fn test_ttl_duration_clamps_negative() {
        assert_eq!(ttl_duration(-5), Duration::ZERO);
        assert_eq!(ttl_duration(90), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_resolve_caches_first_value() {
        let cache = FranchiseCache::new();
        let secrets = Arc::new(MemorySecrets::new().with(CACHE_EXPIRATION_SECRET, "600"));

        assert_eq!(resolve_ttl_seconds(&cache, &secrets).await, 600);

        secrets.insert(CACHE_EXPIRATION_SECRET, "900");
        assert_eq!(resolve_ttl_seconds(&cache, &secrets).await, 600);

        cache.clear();
        assert_eq!(resolve_ttl_seconds(&cache, &secrets).await, 900);
    }
}
