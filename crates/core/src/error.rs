//! Unified error types for the franchise resolver.
//!
//! Every error is `Clone` so a single in-flight cache population can hand the
//! same failure to all of its waiters.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Failures talking to the upstream directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Page body was not a valid paginated envelope.
    #[error("malformed page from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// The `next` cursor chain could not be followed.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// Bearer token could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Failures reading or writing durable snapshots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error<StorageError>> for StorageError {
    fn from(err: tokio_rusqlite::Error<StorageError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => StorageError::Database("connection closed".into()),
            tokio_rusqlite::Error::Close(c) => {
                StorageError::Database(tokio_rusqlite::Error::<rusqlite::Error>::Close(c).to_string())
            }
            _ => StorageError::Database("connection closed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for StorageError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Unified error type for the franchise resolver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty franchise number).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No agency is mapped to the requested franchise number.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Fetching the agency directory failed.
    #[error("FETCH_ERROR: {0}")]
    Fetch(#[from] FetchError),

    /// A per-agency fetch failed mid-transform; no partial index was produced.
    #[error("TRANSFORM_ERROR: {0}")]
    Transform(FetchError),

    /// Snapshot store read or write failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(#[from] StorageError),

    /// Snapshot bytes could not be encoded or decoded.
    #[error("SNAPSHOT_INVALID: {0}")]
    InvalidSnapshot(String),

    /// Configuration could not be resolved.
    #[error("CONFIG_ERROR: {0}")]
    Config(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::NotFound(_) => -32001,
            Error::Fetch(_) => -32008,
            Error::Transform(_) => -32009,
            Error::Storage(_) => -32002,
            Error::InvalidSnapshot(_) => -32003,
            Error::Config(_) => -32010,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
