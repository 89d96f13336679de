//! cache_clear and status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use franchise_client::TokenSource;
use franchise_core::{CacheStatus, FranchiseResolver, RefreshScheduler, RefreshStatsSnapshot, SchedulerState};

use super::json_result;

/// Output structure for cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Always true; the index, TTL, overrides and bearer token were dropped.
    pub cleared: bool,
}

/// Output structure for status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    /// What the in-memory cache holds.
    pub cache: CacheStatus,
    /// Refresh scheduler lifecycle state.
    pub scheduler: SchedulerState,
    /// Refresh cycles since startup.
    pub refresh: RefreshStatsSnapshot,
}

/// Implementation of the cache_clear tool.
///
/// The index stays empty until the next scheduled refresh. The token is
/// dropped too so rotated directory credentials take effect on that refresh.
pub async fn clear_impl(resolver: &FranchiseResolver, tokens: &dyn TokenSource) -> Result<CallToolResult, McpError> {
    resolver.clear();
    tokens.invalidate().await;
    tracing::info!("franchise cache and bearer token cleared");
    json_result(&CacheClearOutput { cleared: true })
}

/// Implementation of the status tool.
pub fn status_impl(resolver: &FranchiseResolver, scheduler: &RefreshScheduler) -> Result<CallToolResult, McpError> {
    json_result(&StatusOutput { cache: resolver.status(), scheduler: scheduler.state(), refresh: scheduler.stats() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, result_text};
    use franchise_client::StaticToken;
    use franchise_core::{AgencyFranchiseEntry, MemorySecrets};

    #[tokio::test]
    async fn test_clear_empties_index() {
        let (resolver, _) = fixture(vec![AgencyFranchiseEntry::new(1, ["10"])], MemorySecrets::new()).await;
        let tokens = StaticToken::new("t0ken");

        let result = clear_impl(&resolver, &tokens).await.unwrap();
        let output: CacheClearOutput = serde_json::from_str(&result_text(&result)).unwrap();

        assert!(output.cleared);
        assert!(resolver.list_agencies().is_empty());
    }

    #[tokio::test]
    async fn test_clear_drops_bearer_token() {
        let (resolver, _) = fixture(Vec::new(), MemorySecrets::new()).await;
        let tokens = StaticToken::new("t0ken");

        clear_impl(&resolver, &tokens).await.unwrap();
        assert_eq!(tokens.invalidations(), 1);

        clear_impl(&resolver, &tokens).await.unwrap();
        assert_eq!(tokens.invalidations(), 2);
    }

    #[tokio::test]
    async fn test_status() {
        let (resolver, scheduler) =
            fixture(vec![AgencyFranchiseEntry::new(1, ["10", "11"])], MemorySecrets::new()).await;

        let result = status_impl(&resolver, &scheduler).unwrap();
        let output: StatusOutput = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(output.cache.agencies, 1);
        assert_eq!(output.cache.franchises, 2);
        assert_eq!(output.scheduler, SchedulerState::Idle);
        assert_eq!(output.refresh.cycles, 0);
    }

    #[tokio::test]
    async fn test_status_reports_scheduler_state() {
        let (resolver, scheduler) = fixture(Vec::new(), MemorySecrets::new()).await;

        scheduler.start().await;
        let output: StatusOutput =
            serde_json::from_str(&result_text(&status_impl(&resolver, &scheduler).unwrap())).unwrap();
        assert_eq!(output.scheduler, SchedulerState::Active);
        assert_eq!(output.cache.ttl_seconds, Some(43_200));

        scheduler.stop().await;
        let output: StatusOutput =
            serde_json::from_str(&result_text(&status_impl(&resolver, &scheduler).unwrap())).unwrap();
        assert_eq!(output.scheduler, SchedulerState::Stopped);
    }
}
