//! Sync error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors that can occur during synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Sync is not configured
    #[error("Sync not configured. Add server_url and api_key to config.")]
    NotConfigured,
    /// The remote store is unreachable
    #[error("Remote store is unreachable")]
    Offline,
    /// Another synchronize() call is still running
    #[error("A synchronization is already in progress")]
    AlreadySyncing,
    /// Remote store request failed
    #[error("Remote store error: {0}")]
    Remote(String),
    /// Local store error
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
    /// Raw database error from sync metadata tables
    #[error("Database error: {0}")]
    Sqlite(#[from] sqlx::Error),
    /// Payload could not be serialized or parsed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Sync metadata is missing or malformed
    #[error("Invalid sync metadata: {0}")]
    Metadata(String),
}
