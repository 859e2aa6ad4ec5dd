//! Error types shared by the storage backends and the persistence tasks

use thiserror::Error;

/// Failure of a key-value storage operation.
///
/// Only the storage layer produces these. Stores recover from them locally
/// (the in-memory collection stays authoritative), so callers see them only
/// when they await a [`crate::state::PersistTicket`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The store's writer task is gone (runtime shut down)
    #[error("persistence channel closed")]
    Closed,

    #[error("storage lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;
