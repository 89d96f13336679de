//! Franchise resolver server entry point.
//!
//! Boots the refresh pipeline, then serves MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use franchise_client::{BearerTokenProvider, DirectoryClient, DirectoryConfig, TokenSource, http_client};
use franchise_core::{
    AppConfig, CacheDb, DirectoryTransform, EnvSecrets, FranchiseCache, FranchiseResolver, RefreshScheduler,
    Refresher, SecretLookup, SqliteSnapshotStore,
};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let agencies_url = config.require_agencies_url()?;
    let token_url = config.require_token_url()?;

    tracing::info!(db_path = %config.db_path.display(), agencies_url, "starting franchise resolver on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let secrets: Arc<dyn SecretLookup> = Arc::new(EnvSecrets::new());

    let directory = DirectoryConfig::from(&config);
    let http = http_client(&directory)?;
    let tokens: Arc<dyn TokenSource> = Arc::new(
        BearerTokenProvider::new(http.clone(), token_url, Arc::clone(&secrets)).with_retry(directory.retry_policy()),
    );
    let fetcher = Arc::new(DirectoryClient::with_http(http, Arc::clone(&tokens)).with_retry(directory.retry_policy()));
    let transform =
        Arc::new(DirectoryTransform::new(fetcher, agencies_url).with_concurrency(config.fetch_concurrency));

    let cache = Arc::new(FranchiseCache::new());
    let store = Arc::new(SqliteSnapshotStore::new(db));
    let refresher = Refresher::new(Arc::clone(&cache), transform, store, Arc::clone(&secrets));
    let scheduler = Arc::new(RefreshScheduler::with_initial_delay(refresher, config.initial_refresh_delay()));

    let state = scheduler.start().await;
    tracing::info!(state = ?state, "refresh scheduler ready");

    let resolver = FranchiseResolver::new(cache, secrets);
    let handler = handler::FranchiseServer::new(resolver, Arc::clone(&scheduler), tokens);
    let server = serve_server(handler, stdio()).await?;

    let served = tokio::select! {
        result = server.waiting() => result.map(|reason| tracing::info!(?reason, "MCP session ended")),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; shutting down");
            Ok(())
        }
    };

    scheduler.stop().await;
    served?;

    Ok(())
}
