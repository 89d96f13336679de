//! In-memory TTL cell with single-flight population.
//!
//! A [`TtlCell`] holds at most one value together with its expiry. Values are
//! replaced wholesale under a short write lock, so readers never observe a
//! partially updated value. Populations started by concurrent
//! [`TtlCell::get_or_populate`] callers are coalesced into one shared future.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::Error;

type Flight<T> = Shared<BoxFuture<'static, Result<T, Error>>>;

/// A cached value with its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub cached_at: Instant,
    /// `None` means the entry never expires.
    pub expires_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let cached_at = Instant::now();
        // An expiry past the end of the clock is treated as never.
        let expires_at = ttl.and_then(|ttl| cached_at.checked_add(ttl));
        Self { value, cached_at, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry, `None` for entries that never expire.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Single-value TTL cache slot.
pub struct TtlCell<T> {
    entry: Arc<RwLock<Option<CacheEntry<T>>>>,
    flight: Mutex<Option<Flight<T>>>,
}

impl<T> Default for TtlCell<T> {
    fn default() -> Self {
        Self { entry: Arc::new(RwLock::new(None)), flight: Mutex::new(None) }
    }
}

impl<T> std::fmt::Debug for TtlCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.entry.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            None => "empty",
            Some(entry) if entry.is_expired() => "expired",
            Some(_) => "fresh",
        };
        f.debug_struct("TtlCell").field("state", &state).finish()
    }
}

impl<T> TtlCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value if present and unexpired. Never populates.
    pub fn get(&self) -> Option<T> {
        self.entry().map(|entry| entry.value)
    }

    /// Current entry (value plus timing) if present and unexpired.
    pub fn entry(&self) -> Option<CacheEntry<T>> {
        let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().filter(|entry| !entry.is_expired()).cloned()
    }

    /// Replace the value; `ttl` of `None` never expires.
    pub fn set(&self, value: T, ttl: Option<Duration>) {
        store(&self.entry, CacheEntry::new(value, ttl));
    }

    /// Drop the value, forcing the next `get_or_populate` to repopulate.
    pub fn remove(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Return the current value, or populate it.
    ///
    /// Callers arriving while a population is in flight wait on that same
    /// population instead of starting their own. The populated value is
    /// stored with a fresh `ttl`. A failed population is handed to every
    /// waiter and leaves the cell empty.
    pub async fn get_or_populate<F, Fut>(&self, ttl: Option<Duration>, populate: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let flight = {
            let mut slot = self.flight.lock().await;
            if let Some(value) = self.get() {
                return Ok(value);
            }

            match slot.as_ref() {
                Some(flight) => flight.clone(),
                None => {
                    let entry = Arc::clone(&self.entry);
                    let pending = populate();
                    let flight = async move {
                        let value = pending.await?;
                        store(&entry, CacheEntry::new(value.clone(), ttl));
                        Ok(value)
                    }
                    .boxed()
                    .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        let mut slot = self.flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }

        result
    }
}

fn store<T>(entry: &RwLock<Option<CacheEntry<T>>>, value: CacheEntry<T>) {
    *entry.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_set_and_expire() {
        let cell = TtlCell::new();
        cell.set(7_i64, Some(Duration::from_secs(60)));
        assert_eq!(cell.get(), Some(7));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cell.get(), Some(7));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cell.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ttl_never_expires() {
        let cell = TtlCell::new();
        cell.set("v".to_string(), None);

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        assert_eq!(cell.get().as_deref(), Some("v"));
        assert!(cell.entry().unwrap().remaining().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let cell = TtlCell::new();
        cell.set(1_u8, None);
        cell.remove();
        assert!(cell.get().is_none());
    }

    #[tokio::test]
    async fn test_populate_once_then_cached() {
        let cell = TtlCell::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = cell
                .get_or_populate(None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42_i64)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_population() {
        let cell = Arc::new(TtlCell::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = Arc::clone(&cell);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cell.get_or_populate(Some(Duration::from_secs(60)), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(vec![1_i64, 2, 3])
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_all_waiters_and_leaves_cell_empty() {
        let cell: Arc<TtlCell<i64>> = Arc::new(TtlCell::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cell = Arc::clone(&cell);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cell.get_or_populate(None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(Error::Fetch(FetchError::Network("connection reset".into())))
                })
                .await
            }));
        }

        for handle in handles {
            assert!(matches!(handle.await.unwrap(), Err(Error::Fetch(_))));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cell.get().is_none());

        // the next wave starts a fresh population
        let value = cell.get_or_populate(None, || async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repopulates_after_expiry() {
        let cell = TtlCell::new();
        cell.get_or_populate(Some(Duration::from_secs(10)), || async { Ok(1_i64) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        let value = cell
            .get_or_populate(Some(Duration::from_secs(10)), || async { Ok(2_i64) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        rt.block_on(async {
            let entry = CacheEntry::new((), Some(Duration::MAX));
            assert!(entry.expires_at.is_none());
            assert!(!entry.is_expired());
        });
    }
}
