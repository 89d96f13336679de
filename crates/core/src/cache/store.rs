//! The entries the resolver keeps in memory.

use std::sync::Arc;

use super::ttl::TtlCell;
use crate::franchise::{FranchiseIndex, FranchiseMapping};

/// Owner of every live cache entry.
///
/// The derived index carries the resolved TTL; the TTL value itself and the
/// manual override list never expire and only go away on [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct FranchiseCache {
    pub index: TtlCell<Arc<FranchiseIndex>>,
    pub ttl_seconds: TtlCell<i64>,
    pub overrides: TtlCell<Arc<Vec<FranchiseMapping>>>,
}

impl FranchiseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the index, TTL and override entries.
    pub fn clear(&self) {
        self.index.remove();
        self.ttl_seconds.remove();
        self.overrides.remove();
        tracing::info!("cleared franchise index, ttl and override entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::franchise::AgencyFranchiseEntry;

    #[tokio::test]
    async fn test_clear_removes_all_entries() {
        let cache = FranchiseCache::new();
        let index = FranchiseIndex::from_entries(vec![AgencyFranchiseEntry::new(1, ["10"])]);
        cache.index.set(Arc::new(index), None);
        cache.ttl_seconds.set(60, None);
        cache.overrides.set(Arc::new(vec![FranchiseMapping::new(2, "20")]), None);

        cache.clear();

        assert!(cache.index.get().is_none());
        assert!(cache.ttl_seconds.get().is_none());
        assert!(cache.overrides.get().is_none());
    }
}
