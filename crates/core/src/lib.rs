//! Core types and shared functionality for the franchise resolver.
//!
//! This crate provides:
//! - The directory transform that derives the franchise index
//! - In-memory TTL cache with a SQLite snapshot for warm starts
//! - The refresh scheduler and the resolution service
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod expiry;
pub mod franchise;
pub mod refresh;
pub mod resolver;
pub mod secrets;

pub use cache::{CacheDb, FranchiseCache, SnapshotStore, SqliteSnapshotStore};
pub use config::AppConfig;
pub use directory::{DirectoryTransform, PageFetcher};
pub use error::{Error, FetchError, StorageError};
pub use franchise::{AgencyFranchiseEntry, FranchiseIndex, FranchiseMapping};
pub use refresh::{RefreshOutcome, RefreshScheduler, RefreshStatsSnapshot, Refresher, SchedulerState};
pub use resolver::{CacheStatus, FranchiseResolver};
pub use secrets::{EnvSecrets, MemorySecrets, SecretLookup};
