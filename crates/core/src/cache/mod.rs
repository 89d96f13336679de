//! Caching for the franchise index.
//!
//! Two layers live here:
//!
//! - [`TtlCell`] / [`FranchiseCache`]: the in-memory store readers query,
//!   with expiry and single-flight population
//! - [`CacheDb`] / [`SqliteSnapshotStore`]: a SQLite-backed durable snapshot
//!   used to warm the in-memory store after a restart

pub mod connection;
pub mod migrations;
pub mod snapshots;
pub mod store;
pub mod ttl;

pub use connection::CacheDb;
pub use snapshots::{INDEX_SNAPSHOT_NAME, SnapshotStore, SqliteSnapshotStore};
pub use store::FranchiseCache;
pub use ttl::{CacheEntry, TtlCell};
