//! Directory transform: agency directory in, franchise index out.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::extract::extract_franchise_numbers;
use super::model::{AgencyRecord, LocationRecord};
use super::{DEFAULT_FETCH_CONCURRENCY, PageFetcher, fetch_all};
use crate::Error;
use crate::error::FetchError;
use crate::franchise::{AgencyFranchiseEntry, FranchiseIndex};

/// Crawls the agency directory and builds the franchise index.
///
/// Location collections are fetched with at most `concurrency` requests in
/// flight. Any failed location fetch fails the whole run and aborts the
/// fetches still pending.
pub struct DirectoryTransform {
    fetcher: Arc<dyn PageFetcher>,
    agencies_url: String,
    concurrency: usize,
}

impl std::fmt::Debug for DirectoryTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTransform")
            .field("agencies_url", &self.agencies_url)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl DirectoryTransform {
    pub fn new(fetcher: Arc<dyn PageFetcher>, agencies_url: impl Into<String>) -> Self {
        Self { fetcher, agencies_url: agencies_url.into(), concurrency: DEFAULT_FETCH_CONCURRENCY }
    }

    /// Bound on concurrent location fetches; values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn agencies_url(&self) -> &str {
        &self.agencies_url
    }

    /// Build a fresh index from the upstream directory.
    ///
    /// # Errors
    ///
    /// - `Error::Fetch` when the agency collection cannot be fetched
    /// - `Error::Transform` when any agency's location collection cannot be fetched
    pub async fn run(&self) -> Result<FranchiseIndex, Error> {
        let start = Instant::now();
        let agencies: Vec<AgencyRecord> = fetch_all(self.fetcher.as_ref(), &self.agencies_url).await?;
        let total = agencies.len();
        tracing::debug!(agencies = total, "fetched agency directory");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (position, agency) in agencies.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);

            join_set.spawn(async move {
                // Held for the whole task so at most `concurrency` fetches run at once
                let _permit = semaphore.acquire_owned().await;
                (position, map_agency(fetcher, agency).await)
            });
        }

        // Completion order varies; restore directory order before building the index.
        let mut slots: Vec<Option<AgencyFranchiseEntry>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            let (position, mapped) =
                joined.map_err(|e| Error::Transform(FetchError::Network(format!("location task failed: {e}"))))?;
            slots[position] = Some(mapped.map_err(Error::Transform)?);
        }
        let entries: Vec<AgencyFranchiseEntry> = slots.into_iter().flatten().collect();

        let index = FranchiseIndex::from_entries(entries);
        tracing::info!(
            agencies = total,
            mapped = index.len(),
            franchises = index.franchise_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built franchise index"
        );

        Ok(index)
    }
}

async fn map_agency(fetcher: Arc<dyn PageFetcher>, agency: AgencyRecord) -> Result<AgencyFranchiseEntry, FetchError> {
    let locations: Vec<LocationRecord> = if agency.has_locations() {
        fetch_all(fetcher.as_ref(), &agency.locations_url).await?
    } else {
        Vec::new()
    };

    Ok(AgencyFranchiseEntry { agency_id: agency.id, franchise_numbers: extract_franchise_numbers(&agency, &locations) })
}
