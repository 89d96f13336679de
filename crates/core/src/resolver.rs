//! Franchise-number resolution over the live cache.
//!
//! Lookups consult the manual overrides first and fall back to the derived
//! index. Listings only ever show the derived index, so an override-only
//! franchise number resolves but is not listed.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cache::FranchiseCache;
use crate::franchise::{FranchiseIndex, FranchiseMapping, load_overrides};
use crate::secrets::SecretLookup;

/// Query-side view of the cache.
#[derive(Clone)]
pub struct FranchiseResolver {
    cache: Arc<FranchiseCache>,
    secrets: Arc<dyn SecretLookup>,
}

/// What the cache currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatus {
    /// Agencies in the derived index.
    pub agencies: usize,
    /// Franchise numbers across all agencies in the derived index.
    pub franchises: usize,
    /// Seconds until the derived index expires; `None` when nothing is cached.
    pub index_expires_in_secs: Option<u64>,
    /// Manual overrides currently loaded; `None` until the first lookup loads them.
    pub overrides: Option<usize>,
    /// Resolved cache TTL; `None` until first resolved.
    pub ttl_seconds: Option<i64>,
}

impl std::fmt::Debug for FranchiseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FranchiseResolver").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl FranchiseResolver {
    pub fn new(cache: Arc<FranchiseCache>, secrets: Arc<dyn SecretLookup>) -> Self {
        Self { cache, secrets }
    }

    pub fn cache(&self) -> &Arc<FranchiseCache> {
        &self.cache
    }

    /// Agency for a franchise number.
    ///
    /// The first matching manual override wins; otherwise the lowest agency id
    /// in the derived index that lists the number. Never populates the derived
    /// index, so this is `None` until the first refresh or warm start.
    pub async fn resolve_by_franchise(&self, franchise_number: &str) -> Option<FranchiseMapping> {
        let overrides = self.overrides().await;
        if let Some(mapping) = overrides.iter().find(|m| m.franchise_number == franchise_number) {
            tracing::debug!(franchise_number, agency_id = mapping.agency_id, "resolved from manual override");
            return Some(mapping.clone());
        }

        let index = self.cache.index.get()?;
        let entry = index.find(franchise_number)?;
        tracing::debug!(franchise_number, agency_id = entry.agency_id, "resolved from franchise index");
        Some(FranchiseMapping::new(entry.agency_id, franchise_number))
    }

    /// Every (agency, franchise) pair in the derived index. Overrides are not included.
    pub fn list_franchises(&self) -> Vec<FranchiseMapping> {
        self.cache.index.get().map(|index| index.mappings().collect()).unwrap_or_default()
    }

    /// The derived index, empty if never populated.
    pub fn list_agencies(&self) -> FranchiseIndex {
        self.cache.index.get().map(|index| FranchiseIndex::clone(&index)).unwrap_or_default()
    }

    /// Drop the index, TTL and overrides so the next use re-reads them.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn status(&self) -> CacheStatus {
        let entry = self.cache.index.entry();
        CacheStatus {
            agencies: entry.as_ref().map_or(0, |e| e.value.len()),
            franchises: entry.as_ref().map_or(0, |e| e.value.franchise_count()),
            index_expires_in_secs: entry.and_then(|e| e.remaining()).map(|d| d.as_secs()),
            overrides: self.cache.overrides.get().map(|o| o.len()),
            ttl_seconds: self.cache.ttl_seconds.get(),
        }
    }

    async fn overrides(&self) -> Arc<Vec<FranchiseMapping>> {
        let secrets = Arc::clone(&self.secrets);
        let loaded = self
            .cache
            .overrides
            .get_or_populate(None, move || async move { Ok(Arc::new(load_overrides(secrets.as_ref()).await)) })
            .await;

        // load_overrides never fails; a failed flight only means no overrides
        loaded.unwrap_or_default()
    }
}
