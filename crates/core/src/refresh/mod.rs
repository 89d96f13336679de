//! Keeping the franchise index fresh.
//!
//! [`Refresher`] runs one refresh cycle or one warm start against the shared
//! cache. [`RefreshScheduler`] drives it on a timer.

pub mod scheduler;

use std::sync::Arc;
use std::time::Instant;

use crate::Error;
use crate::cache::{FranchiseCache, SnapshotStore};
use crate::directory::transform::DirectoryTransform;
use crate::expiry::{resolve_ttl_seconds, ttl_duration};
use crate::franchise::snapshot;
use crate::secrets::SecretLookup;

pub use scheduler::{RefreshScheduler, RefreshStatsSnapshot, SchedulerState};

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The index was replaced. `persisted` is false when the snapshot write failed.
    Updated { agencies: usize, persisted: bool },
    /// The transform produced no entries; the previous index was kept.
    Empty,
    /// The transform failed; the previous index was kept.
    Failed(Error),
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// Everything a refresh cycle touches.
#[derive(Clone)]
pub struct Refresher {
    cache: Arc<FranchiseCache>,
    transform: Arc<DirectoryTransform>,
    store: Arc<dyn SnapshotStore>,
    secrets: Arc<dyn SecretLookup>,
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("cache", &self.cache)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl Refresher {
    pub fn new(
        cache: Arc<FranchiseCache>, transform: Arc<DirectoryTransform>, store: Arc<dyn SnapshotStore>,
        secrets: Arc<dyn SecretLookup>,
    ) -> Self {
        Self { cache, transform, store, secrets }
    }

    pub fn cache(&self) -> &Arc<FranchiseCache> {
        &self.cache
    }

    pub fn secrets(&self) -> &Arc<dyn SecretLookup> {
        &self.secrets
    }

    /// Resolved cache TTL in seconds.
    pub async fn ttl_seconds(&self) -> i64 {
        resolve_ttl_seconds(&self.cache, &self.secrets).await
    }

    /// Seed the index from the durable snapshot.
    ///
    /// Returns the number of agencies loaded. An absent, unreadable, malformed
    /// or empty snapshot loads nothing and leaves the cache cold.
    pub async fn warm_from_snapshot(&self, ttl_seconds: i64) -> usize {
        let bytes = match self.store.read().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::info!("no franchise snapshot found; starting cold");
                return 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read franchise snapshot; starting cold");
                return 0;
            }
        };

        let index = match snapshot::decode(&bytes) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, size = bytes.len(), "franchise snapshot is invalid; starting cold");
                return 0;
            }
        };

        if index.is_empty() {
            tracing::info!("franchise snapshot is empty; starting cold");
            return 0;
        }

        let agencies = index.len();
        self.cache.index.set(Arc::new(index), Some(ttl_duration(ttl_seconds)));
        tracing::info!(agencies, "warmed franchise index from snapshot");
        agencies
    }

    /// Rebuild the index from upstream and persist it.
    ///
    /// Never clears the cache: on failure or an empty result the previous
    /// index stays in place until it expires.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let start = Instant::now();
        tracing::info!("franchise refresh started");

        let index = match self.transform.run().await {
            Ok(index) => index,
            Err(e) => {
                tracing::error!(error = %e, "franchise refresh failed; keeping previous index");
                return RefreshOutcome::Failed(e);
            }
        };

        if index.is_empty() {
            tracing::warn!("franchise refresh produced no agencies; keeping previous index");
            return RefreshOutcome::Empty;
        }

        let ttl_seconds = self.ttl_seconds().await;
        let agencies = index.len();
        let index = Arc::new(index);
        self.cache.index.set(Arc::clone(&index), Some(ttl_duration(ttl_seconds)));

        let persisted = match snapshot::encode(&index) {
            Ok(bytes) => match self.store.write(bytes).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist franchise snapshot");
                    false
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to encode franchise snapshot");
                false
            }
        };

        tracing::info!(
            agencies,
            persisted,
            ttl_seconds,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "franchise refresh completed"
        );

        RefreshOutcome::Updated { agencies, persisted }
    }
}
