//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for concurrency (WAL mode), and running migrations.

use super::migrations;
use crate::error::StorageError;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Snapshot database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path).await.map_err(StorageError::from)?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().await.map_err(StorageError::from)?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| -> Result<(), StorageError> {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(StorageError::from)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }
}
