//! Persistent sync metadata: the singleton sync-info row and the sync log.
//!
//! `sync_info` carries the fingerprint of the whole dataset as of its
//! `last_update`; it is what the engine compares against the remote copy to
//! decide direction. The log table is append-only and never trimmed; the
//! in-memory status store keeps only a bounded window of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::SyncError;

/// Fixed key of the local sync-info row.
pub const SYNC_INFO_KEY: &str = "sync";

/// Remote collection and document id holding the mirrored sync info.
pub const REMOTE_SYNC_COLLECTION: &str = "sync";
pub const REMOTE_SYNC_DOC_ID: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
    Offline,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Error => write!(f, "error"),
            SyncStatus::Offline => write!(f, "offline"),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SyncStatus::Idle),
            "syncing" => Ok(SyncStatus::Syncing),
            "error" => Ok(SyncStatus::Error),
            "offline" => Ok(SyncStatus::Offline),
            _ => Err(format!("Invalid sync status '{}'", s)),
        }
    }
}

/// Fingerprint of one store side as of `last_update`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncInfo {
    pub last_update: DateTime<Utc>,
    pub data_hash: String,
    pub status: SyncStatus,
}

impl SyncInfo {
    pub fn new(data_hash: impl Into<String>) -> Self {
        Self {
            last_update: Utc::now(),
            data_hash: data_hash.into(),
            status: SyncStatus::Idle,
        }
    }

    /// Wire form stored as the remote sync-info document.
    pub fn to_document(&self) -> Value {
        json!({
            "last_update": self.last_update.to_rfc3339(),
            "data_hash": self.data_hash,
            "status": self.status.to_string(),
        })
    }

    /// Parses the remote sync-info document.
    ///
    /// An unparseable or missing `last_update` is treated as the epoch, so
    /// the local side wins the last-writer comparison against it.
    pub fn from_document(doc: &Value) -> Self {
        let last_update = doc
            .get("last_update")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::UNIX_EPOCH);

        let data_hash = doc
            .get("data_hash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let status = doc
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(SyncStatus::Idle);

        Self {
            last_update,
            data_hash,
            status,
        }
    }
}

/// Access to the singleton local sync-info row.
#[derive(Debug, Clone)]
pub struct SyncInfoStore {
    pool: SqlitePool,
}

impl SyncInfoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<Option<SyncInfo>, SyncError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT last_update, data_hash, status FROM sync_info WHERE key = ?",
        )
        .bind(SYNC_INFO_KEY)
        .fetch_optional(&self.pool)
        .await?;

        let Some((last_update, data_hash, status)) = row else {
            return Ok(None);
        };

        let last_update = DateTime::parse_from_rfc3339(&last_update)
            .map_err(|e| SyncError::Metadata(format!("bad last_update: {}", e)))?
            .with_timezone(&Utc);
        let status = status
            .parse()
            .map_err(|e: String| SyncError::Metadata(e))?;

        Ok(Some(SyncInfo {
            last_update,
            data_hash,
            status,
        }))
    }

    pub async fn save(&self, info: &SyncInfo) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO sync_info (key, last_update, data_hash, status) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET \
             last_update = excluded.last_update, \
             data_hash = excluded.data_hash, \
             status = excluded.status",
        )
        .bind(SYNC_INFO_KEY)
        .bind(info.last_update.to_rfc3339())
        .bind(&info.data_hash)
        .bind(info.status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Push,
    Pull,
    Conflict,
    Sync,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::Push => write!(f, "push"),
            SyncOperation::Pull => write!(f, "pull"),
            SyncOperation::Conflict => write!(f, "conflict"),
            SyncOperation::Sync => write!(f, "sync"),
        }
    }
}

impl FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(SyncOperation::Push),
            "pull" => Ok(SyncOperation::Pull),
            "conflict" => Ok(SyncOperation::Conflict),
            "sync" => Ok(SyncOperation::Sync),
            _ => Err(format!("Invalid sync operation '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Success => write!(f, "success"),
            LogStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(LogStatus::Success),
            "error" => Ok(LogStatus::Error),
            _ => Err(format!("Invalid log status '{}'", s)),
        }
    }
}

/// One line of the append-only sync audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: SyncOperation,
    pub status: LogStatus,
    pub details: String,
    pub affected_tables: BTreeSet<String>,
    pub error: Option<String>,
}

impl SyncLogEntry {
    pub fn new(operation: SyncOperation, status: LogStatus, details: impl Into<String>) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            operation,
            status,
            details: details.into(),
            affected_tables: BTreeSet::new(),
            error: None,
        }
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Access to the persistent sync-log table.
#[derive(Debug, Clone)]
pub struct SyncLogStore {
    pool: SqlitePool,
}

impl SyncLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends an entry and returns it with the assigned id.
    pub async fn append(&self, mut entry: SyncLogEntry) -> Result<SyncLogEntry, SyncError> {
        let tables = serde_json::to_string(&entry.affected_tables)?;

        let result = sqlx::query(
            "INSERT INTO sync_log (timestamp, operation, status, details, affected_tables, error) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.timestamp.to_rfc3339())
        .bind(entry.operation.to_string())
        .bind(entry.status.to_string())
        .bind(&entry.details)
        .bind(&tables)
        .bind(&entry.error)
        .execute(&self.pool)
        .await?;

        entry.id = result.last_insert_rowid();
        Ok(entry)
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SyncLogEntry>, SyncError> {
        let rows: Vec<(i64, String, String, String, String, String, Option<String>)> =
            sqlx::query_as(
                "SELECT id, timestamp, operation, status, details, affected_tables, error \
                 FROM sync_log ORDER BY id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, timestamp, operation, status, details, affected_tables, error) in rows {
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| SyncError::Metadata(format!("bad log timestamp: {}", e)))?
                .with_timezone(&Utc);
            let operation = operation
                .parse()
                .map_err(|e: String| SyncError::Metadata(e))?;
            let status = status
                .parse()
                .map_err(|e: String| SyncError::Metadata(e))?;
            let affected_tables = serde_json::from_str(&affected_tables).unwrap_or_default();

            entries.push(SyncLogEntry {
                id,
                timestamp,
                operation,
                status,
                details,
                affected_tables,
                error,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup() -> (SyncInfoStore, SyncLogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(Some(temp_dir.path().join("test.db"))).await.unwrap();
        (
            SyncInfoStore::new(pool.clone()),
            SyncLogStore::new(pool),
            temp_dir,
        )
    }

    #[tokio::test]
    async fn test_sync_info_roundtrip() {
        let (info_store, _, _temp) = setup().await;

        assert!(info_store.load().await.unwrap().is_none());

        let info = SyncInfo::new("abc123");
        info_store.save(&info).await.unwrap();

        let loaded = info_store.load().await.unwrap().unwrap();
        assert_eq!(loaded.data_hash, "abc123");
        assert_eq!(loaded.status, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_sync_info_save_is_singleton() {
        let (info_store, _, _temp) = setup().await;

        info_store.save(&SyncInfo::new("first")).await.unwrap();
        info_store.save(&SyncInfo::new("second")).await.unwrap();

        let loaded = info_store.load().await.unwrap().unwrap();
        assert_eq!(loaded.data_hash, "second");
    }

    #[test]
    fn test_sync_info_document_roundtrip() {
        let info = SyncInfo::new("deadbeef");
        let doc = info.to_document();
        let parsed = SyncInfo::from_document(&doc);

        assert_eq!(parsed.data_hash, "deadbeef");
        assert_eq!(parsed.status, SyncStatus::Idle);
        // RFC 3339 survives the round trip to the second
        assert_eq!(
            parsed.last_update.timestamp(),
            info.last_update.timestamp()
        );
    }

    #[test]
    fn test_sync_info_bad_timestamp_falls_back_to_epoch() {
        let doc = serde_json::json!({
            "last_update": "not a date",
            "data_hash": "abc",
            "status": "idle",
        });
        let parsed = SyncInfo::from_document(&doc);
        assert_eq!(parsed.last_update, DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_log_append_and_recent() {
        let (_, log_store, _temp) = setup().await;

        let entry = SyncLogEntry::new(SyncOperation::Push, LogStatus::Success, "pushed 3 records")
            .with_tables(["pets", "weights"]);
        let appended = log_store.append(entry).await.unwrap();
        assert!(appended.id > 0);

        let failed = SyncLogEntry::new(SyncOperation::Pull, LogStatus::Error, "pull failed")
            .with_error("connection reset");
        log_store.append(failed).await.unwrap();

        let recent = log_store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].operation, SyncOperation::Pull);
        assert_eq!(recent[0].error.as_deref(), Some("connection reset"));
        assert_eq!(recent[1].affected_tables.len(), 2);
    }
}
