//! The change queue: pending local mutations awaiting transmission.
//!
//! Every domain write that happens outside a full sync appends a batch of
//! table changes here, so draining the queue replays exactly what changed
//! instead of re-scanning whole tables. Entries are never merged: two
//! updates to the same record stay two changes, replayed in order, so the
//! later one wins. Entries are kept after processing for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;

use super::error::SyncError;
use crate::db::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOp::Create => write!(f, "create"),
            ChangeOp::Update => write!(f, "update"),
            ChangeOp::Delete => write!(f, "delete"),
        }
    }
}

/// One pending mutation against one record in one table. Immutable once
/// created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableChange {
    pub table_name: String,
    pub operation: ChangeOp,
    pub timestamp: DateTime<Utc>,
    pub record_id: i64,
    /// Snapshot of the record at the time of the change, for create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Record>,
}

impl TableChange {
    pub fn create(table: impl Into<String>, record_id: i64, record: Record) -> Self {
        Self {
            table_name: table.into(),
            operation: ChangeOp::Create,
            timestamp: Utc::now(),
            record_id,
            changes: Some(record),
        }
    }

    pub fn update(table: impl Into<String>, record_id: i64, record: Record) -> Self {
        Self {
            table_name: table.into(),
            operation: ChangeOp::Update,
            timestamp: Utc::now(),
            record_id,
            changes: Some(record),
        }
    }

    pub fn delete(table: impl Into<String>, record_id: i64) -> Self {
        Self {
            table_name: table.into(),
            operation: ChangeOp::Delete,
            timestamp: Utc::now(),
            record_id,
            changes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
            QueueStatus::Processing => write!(f, "processing"),
            QueueStatus::Completed => write!(f, "completed"),
            QueueStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "completed" => Ok(QueueStatus::Completed),
            "error" => Ok(QueueStatus::Error),
            _ => Err(format!("Invalid queue status '{}'", s)),
        }
    }
}

/// A queued batch of changes with its processing state.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncQueueEntry {
    pub id: i64,
    pub changes: Vec<TableChange>,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Persistent, ordered queue of pending mutations.
#[derive(Debug, Clone)]
pub struct ChangeQueue {
    pool: SqlitePool,
}

impl ChangeQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends a batch of changes as one pending entry.
    pub async fn enqueue(&self, changes: Vec<TableChange>) -> Result<i64, SyncError> {
        let payload = serde_json::to_string(&changes)?;

        let result = sqlx::query(
            "INSERT INTO sync_queue (changes, status, created_at) VALUES (?, ?, ?)",
        )
        .bind(&payload)
        .bind(QueueStatus::Pending.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Number of entries still pending. Processing, completed, and failed
    /// entries do not count.
    pub async fn pending_count(&self) -> Result<i64, SyncError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sync_queue WHERE status = ?")
                .bind(QueueStatus::Pending.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// All pending entries in creation order.
    pub async fn pending(&self) -> Result<Vec<SyncQueueEntry>, SyncError> {
        self.select_entries("WHERE status = 'pending' ORDER BY id", None)
            .await
    }

    /// Most recent entries of any status, newest first.
    pub async fn entries(&self, limit: i64) -> Result<Vec<SyncQueueEntry>, SyncError> {
        self.select_entries("ORDER BY id DESC LIMIT ?", Some(limit))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<SyncQueueEntry>, SyncError> {
        let mut entries = self.select_entries("WHERE id = ?", Some(id)).await?;
        Ok(entries.pop())
    }

    async fn select_entries(
        &self,
        clause: &str,
        bind: Option<i64>,
    ) -> Result<Vec<SyncQueueEntry>, SyncError> {
        let sql = format!(
            "SELECT id, changes, status, created_at, processed_at, error FROM sync_queue {}",
            clause
        );

        let query = sqlx::query_as::<_, (i64, String, String, String, Option<String>, Option<String>)>(&sql);
        let query = match bind {
            Some(value) => query.bind(value),
            None => query,
        };

        let rows = query.fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, changes, status, created_at, processed_at, error) in rows {
            entries.push(SyncQueueEntry {
                id,
                changes: serde_json::from_str(&changes)?,
                status: status
                    .parse()
                    .map_err(|e: String| SyncError::Metadata(e))?,
                created_at: parse_timestamp(&created_at)?,
                processed_at: processed_at.as_deref().map(parse_timestamp).transpose()?,
                error,
            });
        }

        Ok(entries)
    }

    pub async fn mark_processing(&self, id: i64) -> Result<(), SyncError> {
        self.set_status(id, QueueStatus::Processing, None).await
    }

    pub async fn mark_completed(&self, id: i64) -> Result<(), SyncError> {
        self.set_status(id, QueueStatus::Completed, None).await
    }

    pub async fn mark_error(&self, id: i64, message: &str) -> Result<(), SyncError> {
        self.set_status(id, QueueStatus::Error, Some(message)).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: QueueStatus,
        error: Option<&str>,
    ) -> Result<(), SyncError> {
        let processed_at = match status {
            QueueStatus::Completed | QueueStatus::Error => Some(Utc::now().to_rfc3339()),
            _ => None,
        };

        sqlx::query(
            "UPDATE sync_queue SET status = ?, processed_at = COALESCE(?, processed_at), error = ? \
             WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(processed_at)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, SyncError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| SyncError::Metadata(format!("bad queue timestamp: {}", e)))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (ChangeQueue, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(Some(temp_dir.path().join("test.db"))).await.unwrap();
        (ChangeQueue::new(pool), temp_dir)
    }

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_pending_count() {
        let (queue, _temp) = setup().await;

        assert_eq!(queue.pending_count().await.unwrap(), 0);

        queue
            .enqueue(vec![TableChange::create(
                "pets",
                1,
                record(json!({"name": "Rex"})),
            )])
            .await
            .unwrap();
        queue
            .enqueue(vec![TableChange::delete("pets", 2)])
            .await
            .unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_entries_are_not_merged() {
        let (queue, _temp) = setup().await;

        // Two mutations of the same record stay two entries.
        queue
            .enqueue(vec![TableChange::update(
                "pets",
                1,
                record(json!({"name": "A"})),
            )])
            .await
            .unwrap();
        queue
            .enqueue(vec![TableChange::update(
                "pets",
                1,
                record(json!({"name": "B"})),
            )])
            .await
            .unwrap();

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        // Creation order preserved
        assert!(pending[0].id < pending[1].id);
        assert_eq!(
            pending[0].changes[0].changes.as_ref().unwrap()["name"],
            "A"
        );
        assert_eq!(
            pending[1].changes[0].changes.as_ref().unwrap()["name"],
            "B"
        );
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (queue, _temp) = setup().await;

        let id = queue
            .enqueue(vec![TableChange::delete("foods", 3)])
            .await
            .unwrap();

        queue.mark_processing(id).await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 0);

        let entry = queue.get(id).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Processing);
        assert!(entry.processed_at.is_none());

        queue.mark_completed(id).await.unwrap();
        let entry = queue.get(id).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Completed);
        assert!(entry.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_error_captures_message() {
        let (queue, _temp) = setup().await;

        let id = queue
            .enqueue(vec![TableChange::delete("foods", 3)])
            .await
            .unwrap();
        queue.mark_error(id, "remote refused").await.unwrap();

        let entry = queue.get(id).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Error);
        assert_eq!(entry.error.as_deref(), Some("remote refused"));
        // Failed entries are kept, not deleted
        assert_eq!(queue.entries(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_excludes_terminal_entries() {
        let (queue, _temp) = setup().await;

        let a = queue
            .enqueue(vec![TableChange::delete("pets", 1)])
            .await
            .unwrap();
        let b = queue
            .enqueue(vec![TableChange::delete("pets", 2)])
            .await
            .unwrap();
        queue
            .enqueue(vec![TableChange::delete("pets", 3)])
            .await
            .unwrap();

        queue.mark_completed(a).await.unwrap();
        queue.mark_error(b, "boom").await.unwrap();

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].changes[0].record_id, 3);
    }
}
