//! Bounded retry for transient directory and token failures.
//!
//! Network errors, timeouts, `429` and `5xx` are retried after a fixed delay.
//! Every other status (including `401`) is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use franchise_core::FetchError;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How many times to retry a transient failure, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: DEFAULT_RETRIES, delay: DEFAULT_RETRY_DELAY }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self { retries: 0, delay: Duration::ZERO }
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out.
    pub(crate) async fn run<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut retries_left = self.retries;
        loop {
            match attempt().await {
                Err(err) if retries_left > 0 && is_transient(&err) => {
                    retries_left -= 1;
                    tracing::warn!(url, error = %err, retries_left, "transient HTTP failure; retrying");
                    tokio::time::sleep(self.delay).await;
                }
                result => return result,
            }
        }
    }
}

/// Whether a failure is worth another attempt.
pub fn is_transient(err: &FetchError) -> bool {
    match err {
        FetchError::Network(_) | FetchError::Timeout(_) => true,
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}
