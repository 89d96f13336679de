//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.

use std::num::ParseIntError;

use crate::error::StorageError;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL).
///
/// Applied in order; every migration is idempotent (CREATE IF NOT EXISTS).
const MIGRATIONS: &[(&str, &str)] = &[("1", include_str!("../../migrations/001_blobs.sql"))];

/// Run any pending migrations.
///
/// Creates the _migrations table if it doesn't exist, checks the current
/// version, and applies any migrations that haven't been run yet.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), StorageError> {
    conn.call(|conn| -> Result<(), StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| StorageError::Migration(e.to_string()))?;
            if version_num > current {
                conn.execute_batch(sql)
                    .map_err(|e| StorageError::Migration(format!("version {version_num}: {e}")))?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )?;
                tracing::debug!(version = version_num, "applied migration");
            }
        }

        Ok(())
    })
    .await
    .map_err(StorageError::from)
}
