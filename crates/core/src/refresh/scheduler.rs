//! Timer-driven refresh of the franchise index.
//!
//! `start` warms the cache from the last snapshot, then arms a recurring
//! timer. The first tick fires after the initial delay and the rest every
//! `ttl / 2` seconds. Each tick hands the refresh to its own task, so a slow
//! upstream never delays the timer and overlapping refreshes are allowed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{RefreshOutcome, Refresher};
use crate::expiry::refresh_occurrence;

/// Delay before the first scheduled refresh.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Lifecycle of a [`RefreshScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Not started yet.
    Idle,
    /// Loading the snapshot before the timer is armed.
    Warming,
    /// Timer armed.
    Active,
    /// The TTL leaves no refresh interval; no timer was armed.
    Disabled,
    /// Stopped; no further refreshes will be scheduled.
    Stopped,
}

/// Refresh cycle counters since startup.
#[derive(Debug, Default)]
pub struct RefreshStats {
    pub cycles: AtomicU64,
    pub updates: AtomicU64,
    pub failures: AtomicU64,
}

impl RefreshStats {
    fn record(&self, outcome: &RefreshOutcome) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match outcome {
            RefreshOutcome::Updated { .. } => {
                self.updates.fetch_add(1, Ordering::Relaxed);
            }
            RefreshOutcome::Failed(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            RefreshOutcome::Empty => {}
        }
    }

    pub fn snapshot(&self) -> RefreshStatsSnapshot {
        RefreshStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RefreshStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefreshStatsSnapshot {
    pub cycles: u64,
    pub updates: u64,
    pub failures: u64,
}

struct TimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the refresh timer.
pub struct RefreshScheduler {
    refresher: Refresher,
    initial_delay: Duration,
    started: AtomicBool,
    state: std::sync::Mutex<SchedulerState>,
    timer: Mutex<Option<TimerHandle>>,
    stats: Arc<RefreshStats>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("state", &self.state())
            .field("initial_delay", &self.initial_delay)
            .finish_non_exhaustive()
    }
}

impl RefreshScheduler {
    pub fn new(refresher: Refresher) -> Self {
        Self::with_initial_delay(refresher, DEFAULT_INITIAL_DELAY)
    }

    pub fn with_initial_delay(refresher: Refresher, initial_delay: Duration) -> Self {
        Self {
            refresher,
            initial_delay,
            started: AtomicBool::new(false),
            state: std::sync::Mutex::new(SchedulerState::Idle),
            timer: Mutex::new(None),
            stats: Arc::new(RefreshStats::default()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> RefreshStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    /// Warm the cache and arm the timer.
    ///
    /// Only the first call does anything; later calls return the current state.
    pub async fn start(&self) -> SchedulerState {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(state = ?self.state(), "refresh scheduler already started");
            return self.state();
        }

        let ttl_seconds = self.refresher.ttl_seconds().await;
        let occurrence = refresh_occurrence(ttl_seconds);
        if occurrence <= 0 {
            tracing::error!(ttl_seconds, occurrence, "cache TTL leaves no refresh interval; refresh disabled");
            self.transition(SchedulerState::Disabled);
            return self.state();
        }

        if !self.transition(SchedulerState::Warming) {
            return self.state();
        }
        self.refresher.warm_from_snapshot(ttl_seconds).await;

        let mut timer = self.timer.lock().await;
        if self.state() == SchedulerState::Stopped {
            return SchedulerState::Stopped;
        }

        let period = Duration::from_secs(occurrence.unsigned_abs());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_timer(
            self.refresher.clone(),
            Arc::clone(&self.stats),
            self.initial_delay,
            period,
            shutdown_rx,
        ));
        *timer = Some(TimerHandle { shutdown, task });
        self.transition(SchedulerState::Active);

        tracing::info!(
            ttl_seconds,
            interval_secs = period.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "refresh scheduler started"
        );
        SchedulerState::Active
    }

    /// Disarm the timer and wait for the timer task to exit.
    ///
    /// Refreshes already running finish on their own. Safe to call more than once.
    pub async fn stop(&self) {
        let handle = self.timer.lock().await.take();
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SchedulerState::Stopped;

        let Some(TimerHandle { shutdown, task }) = handle else {
            return;
        };

        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "refresh timer task ended abnormally");
        }
        tracing::info!("refresh scheduler stopped");
    }

    /// Move to `next` unless already stopped.
    fn transition(&self, next: SchedulerState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SchedulerState::Stopped {
            return false;
        }
        *state = next;
        true
    }
}

async fn run_timer(
    refresher: Refresher, stats: Arc<RefreshStats>, initial_delay: Duration, period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticks = tokio::time::interval_at(Instant::now() + initial_delay, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticks.tick() => {
                let refresher = refresher.clone();
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    let outcome = refresher.refresh_once().await;
                    stats.record(&outcome);
                });
            }
        }
    }

    tracing::debug!("refresh timer exited");
}
