//! Durable snapshot storage.
//!
//! A snapshot is an opaque byte blob stored under a fixed name. The store has
//! overwrite-on-write semantics and keeps no history.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::error::StorageError;

/// Blob name used for the franchise index snapshot.
pub const INDEX_SNAPSHOT_NAME: &str = "franchise-index.json";

/// Durable byte store used to warm the cache across restarts.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the most recent snapshot, `None` if nothing was ever written.
    async fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the stored snapshot.
    async fn write(&self, bytes: Vec<u8>) -> Result<(), StorageError>;
}

impl CacheDb {
    /// Insert or replace a named blob.
    pub async fn put_blob(&self, name: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let name = name.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), StorageError> {
                let size = body.len() as i64;
                conn.execute(
                    "INSERT INTO blobs (name, body, size, updated_at) VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(name) DO UPDATE SET
                        body = excluded.body,
                        size = excluded.size,
                        updated_at = excluded.updated_at",
                    params![name, body, size, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(StorageError::from)
    }

    /// Get a named blob.
    ///
    /// Returns None if the name doesn't exist.
    pub async fn get_blob(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, StorageError> {
                let result = conn.query_row("SELECT body FROM blobs WHERE name = ?1", params![name], |row| row.get(0));

                match result {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(StorageError::from)
    }
}

/// [`SnapshotStore`] backed by a single row of the SQLite `blobs` table.
#[derive(Clone, Debug)]
pub struct SqliteSnapshotStore {
    db: CacheDb,
    name: String,
}

impl SqliteSnapshotStore {
    pub fn new(db: CacheDb) -> Self {
        Self::with_name(db, INDEX_SNAPSHOT_NAME)
    }

    pub fn with_name(db: CacheDb, name: impl Into<String>) -> Self {
        Self { db, name: name.into() }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let body = self.db.get_blob(&self.name).await?;
        tracing::debug!(blob = %self.name, found = body.is_some(), "read snapshot");
        Ok(body)
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), StorageError> {
        let size = bytes.len();
        self.db.put_blob(&self.name, bytes).await?;
        tracing::debug!(blob = %self.name, size, "wrote snapshot");
        Ok(())
    }
}
