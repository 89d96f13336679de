//! Upstream agency directory.
//!
//! The directory is a paginated JSON API. Each page is an envelope
//! `{"count", "next", "previous", "results": [...]}`; `next` is the URL of the
//! following page or null on the last one.
//!
//! Transport is abstracted behind [`PageFetcher`], which returns the raw body
//! of one page. [`fetch_all`] walks the `next` cursor and decodes the records.

pub mod extract;
pub mod model;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::FetchError;

pub use extract::{extract_franchise_numbers, is_franchise_number, subdomain_franchise};
pub use model::{AgencyRecord, LocationRecord};
pub use transform::DirectoryTransform;

/// Default bound on concurrent per-agency location fetches.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Hard ceiling on pages followed in one walk.
pub const MAX_PAGES: usize = 10_000;

/// Fetches the raw body of a single directory page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// One page of a paginated collection.
#[derive(Debug, Deserialize)]
pub struct ResourcePage<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Fetch every record of a paginated collection, following `next` until it
/// is null or blank.
///
/// # Errors
///
/// Fails on the first page that cannot be fetched or decoded, when a cursor
/// revisits a page, or past [`MAX_PAGES`].
pub async fn fetch_all<T>(fetcher: &dyn PageFetcher, url: &str) -> Result<Vec<T>, FetchError>
where
    T: DeserializeOwned + Send,
{
    let mut records = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(url.to_string());

    while let Some(url) = next.take() {
        if visited.len() >= MAX_PAGES {
            return Err(FetchError::Pagination(format!("more than {MAX_PAGES} pages starting at {url}")));
        }
        if !visited.insert(url.clone()) {
            return Err(FetchError::Pagination(format!("cursor cycle at {url}")));
        }

        let body = fetcher.fetch_page(&url).await?;
        let page: ResourcePage<T> = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed { url: url.clone(), reason: e.to_string() })?;

        tracing::trace!(url = %url, results = page.results.len(), total = ?page.count, "fetched page");

        records.extend(page.results);
        next = page.next.filter(|n| !n.trim().is_empty());
    }

    Ok(records)
}
