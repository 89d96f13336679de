//! Scripted page fetcher for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::PageFetcher;
use crate::error::FetchError;

#[derive(Debug, Default)]
pub(crate) struct FakeFetcher {
    pages: RwLock<HashMap<String, Result<String, u16>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, url: &str, body: &str) -> Self {
        self.set_page(url, body);
        self
    }

    pub(crate) fn failing(self, url: &str, status: u16) -> Self {
        self.set_failing(url, status);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_page(&self, url: &str, body: &str) {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Ok(body.to_string()));
    }

    pub(crate) fn set_failing(&self, url: &str, status: u16) {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Err(status));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let page = self
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match page {
            Some(Ok(body)) => Ok(body.into_bytes()),
            Some(Err(status)) => Err(FetchError::Status { url: url.to_string(), status }),
            None => Err(FetchError::Status { url: url.to_string(), status: 404 }),
        }
    }
}
