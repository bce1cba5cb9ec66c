//! The sync engine: decides direction, moves data, drains the queue.
//!
//! `synchronize()` is the single entry point. Each invocation runs
//! preflight (connectivity), fingerprint comparison, an optional push or
//! pull, and a queue drain, then records the outcome in the sync log and
//! the status store. Conflict resolution is whole-dataset last-writer-wins:
//! when fingerprints differ, the side whose sync info carries the more
//! recent `last_update` overwrites the other entirely.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::SyncError;
use super::fingerprint::compute_fingerprint;
use super::meta::{
    LogStatus, SyncInfo, SyncInfoStore, SyncLogEntry, SyncLogStore, SyncOperation, SyncStatus,
    REMOTE_SYNC_COLLECTION, REMOTE_SYNC_DOC_ID,
};
use super::photo::{prepare_photo, PhotoCompressor, SizeCapCompressor};
use super::queue::{ChangeOp, ChangeQueue, SyncQueueEntry};
use super::remote::RemoteStore;
use super::status::SyncStatusStore;
use crate::db::{LocalStore, Record, DOMAIN_TABLES};

/// How push replaces remote collections.
///
/// Full replace mirrors the reference behavior: delete everything, then
/// re-add. Diff upsert never leaves a collection empty mid-push: it writes
/// every local record first and only then deletes remote strays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    #[default]
    FullReplace,
    DiffUpsert,
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceStrategy::FullReplace => write!(f, "full-replace"),
            ReplaceStrategy::DiffUpsert => write!(f, "diff-upsert"),
        }
    }
}

impl FromStr for ReplaceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full-replace" => Ok(ReplaceStrategy::FullReplace),
            "diff-upsert" => Ok(ReplaceStrategy::DiffUpsert),
            _ => Err(format!(
                "Invalid replace strategy '{}'. Valid options: full-replace, diff-upsert",
                s
            )),
        }
    }
}

/// What a `synchronize()` invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Preflight failed; nothing was attempted.
    Offline,
    /// Another invocation was already running; nothing was touched.
    AlreadySyncing,
    /// Fingerprints matched; only the queue was drained.
    NoChanges,
    Pushed,
    Pulled,
    /// The transfer phase failed; see the report's error.
    Failed,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Offline => write!(f, "offline"),
            SyncOutcome::AlreadySyncing => write!(f, "already syncing"),
            SyncOutcome::NoChanges => write!(f, "no changes"),
            SyncOutcome::Pushed => write!(f, "pushed"),
            SyncOutcome::Pulled => write!(f, "pulled"),
            SyncOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of one `synchronize()` invocation.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Queue entries applied to the remote store.
    pub drained: usize,
    /// Queue entries that failed and were left marked `error`.
    pub failed_entries: usize,
    pub error: Option<String>,
}

impl SyncReport {
    fn outcome(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            drained: 0,
            failed_entries: 0,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            outcome: SyncOutcome::Failed,
            drained: 0,
            failed_entries: 0,
            error: Some(error),
        }
    }
}

/// Orchestrates local/remote synchronization.
pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    queue: ChangeQueue,
    info: SyncInfoStore,
    log: SyncLogStore,
    status: SyncStatusStore,
    compressor: Box<dyn PhotoCompressor>,
    strategy: ReplaceStrategy,
    in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        status: SyncStatusStore,
    ) -> Self {
        let pool = store.pool().clone();
        Self {
            queue: ChangeQueue::new(pool.clone()),
            info: SyncInfoStore::new(pool.clone()),
            log: SyncLogStore::new(pool),
            store,
            remote,
            status,
            compressor: Box::new(SizeCapCompressor::default()),
            strategy: ReplaceStrategy::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_compressor(mut self, compressor: Box<dyn PhotoCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn queue(&self) -> &ChangeQueue {
        &self.queue
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn status(&self) -> &SyncStatusStore {
        &self.status
    }

    pub fn log(&self) -> &SyncLogStore {
        &self.log
    }

    /// Runs one synchronization pass.
    ///
    /// Never panics or returns an error to the caller: failures are
    /// translated into the report, the status store, and the sync log.
    /// Concurrent calls are rejected with `AlreadySyncing`.
    pub async fn synchronize(&self) -> SyncReport {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            let mut report = SyncReport::outcome(SyncOutcome::AlreadySyncing);
            report.error = Some(SyncError::AlreadySyncing.to_string());
            return report;
        }

        let report = self.run().await;
        self.in_flight.store(false, Ordering::SeqCst);
        report
    }

    async fn run(&self) -> SyncReport {
        self.status.set_syncing(true);
        self.status.set_status(SyncStatus::Syncing);

        // Preflight: nothing is attempted while offline.
        if !self.remote.is_online().await {
            let message = SyncError::Offline.to_string();
            tracing::warn!("sync skipped: {}", message);
            self.record_log(
                SyncLogEntry::new(SyncOperation::Sync, LogStatus::Error, "preflight failed")
                    .with_error(&message),
            )
            .await;
            self.status.set_status(SyncStatus::Offline);
            self.status.set_last_error(Some(message.clone()));
            self.status.set_syncing(false);

            let mut report = SyncReport::outcome(SyncOutcome::Offline);
            report.error = Some(message);
            return report;
        }

        match self.transfer_and_drain().await {
            Ok(report) => {
                self.status.set_status(SyncStatus::Idle);
                self.status.set_last_error(None);
                self.status.set_last_sync(chrono::Utc::now());
                self.update_pending_count().await;
                self.status.set_syncing(false);
                report
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("sync failed: {}", message);
                self.record_log(
                    SyncLogEntry::new(SyncOperation::Sync, LogStatus::Error, "sync failed")
                        .with_error(&message),
                )
                .await;
                self.status.set_status(SyncStatus::Error);
                self.status.set_last_error(Some(message.clone()));
                self.update_pending_count().await;
                self.status.set_syncing(false);
                SyncReport::failed(message)
            }
        }
    }

    async fn transfer_and_drain(&self) -> Result<SyncReport, SyncError> {
        let outcome = self.decide_and_transfer().await?;
        let (drained, failed_entries) = self.drain_queue().await?;

        if outcome == SyncOutcome::NoChanges || drained + failed_entries > 0 {
            let status = if failed_entries > 0 {
                LogStatus::Error
            } else {
                LogStatus::Success
            };
            let total = drained + failed_entries;
            let details = if total == 0 {
                "Already in sync; queue empty".to_string()
            } else {
                format!(
                    "Drained {} queue entr{} ({} failed)",
                    total,
                    if total == 1 { "y" } else { "ies" },
                    failed_entries
                )
            };
            let entry = SyncLogEntry::new(SyncOperation::Sync, status, details);
            self.record_log(entry).await;
        }

        Ok(SyncReport {
            outcome,
            drained,
            failed_entries,
            error: None,
        })
    }

    /// Fingerprint comparison and direction choice.
    async fn decide_and_transfer(&self) -> Result<SyncOutcome, SyncError> {
        let Some(local) = self.info.load().await? else {
            // First run: local is authoritative.
            tracing::info!("no local sync info; pushing");
            self.push().await?;
            return Ok(SyncOutcome::Pushed);
        };

        let remote_doc = self
            .remote
            .get_one(REMOTE_SYNC_COLLECTION, REMOTE_SYNC_DOC_ID)
            .await?;
        let Some(remote_doc) = remote_doc else {
            tracing::info!("no remote sync info; pushing");
            self.push().await?;
            return Ok(SyncOutcome::Pushed);
        };

        let remote_info = SyncInfo::from_document(&remote_doc);
        if local.data_hash == remote_info.data_hash {
            tracing::debug!("fingerprints match; nothing to transfer");
            return Ok(SyncOutcome::NoChanges);
        }

        // Both sides moved: whole-dataset last-writer-wins.
        let local_wins = local.last_update >= remote_info.last_update;
        let winner = if local_wins { "local" } else { "remote" };
        tracing::info!(
            local = %local.last_update,
            remote = %remote_info.last_update,
            "fingerprints differ; {} side wins",
            winner
        );
        self.record_log(SyncLogEntry::new(
            SyncOperation::Conflict,
            LogStatus::Success,
            format!("Fingerprints differ; {} side is newer and wins", winner),
        ))
        .await;

        if local_wins {
            self.push().await?;
            Ok(SyncOutcome::Pushed)
        } else {
            self.pull(remote_info).await?;
            Ok(SyncOutcome::Pulled)
        }
    }

    /// Replaces every remote collection with the local records, then writes
    /// the fresh fingerprint to both sides.
    async fn push(&self) -> Result<(), SyncError> {
        let mut pushed = 0usize;

        for table in DOMAIN_TABLES {
            let records = self.store.all(table).await?;
            let mut outbound = Vec::with_capacity(records.len());
            for record in &records {
                let id = record
                    .get("id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        SyncError::Metadata(format!("record in {} without id", table))
                    })?;
                outbound.push((id.to_string(), self.outbound_record(table, id, record)));
            }

            match self.strategy {
                ReplaceStrategy::FullReplace => {
                    self.remote.clear(table).await?;
                    for (id, doc) in &outbound {
                        self.remote.upsert(table, id, doc).await?;
                    }
                }
                ReplaceStrategy::DiffUpsert => {
                    let existing = self.remote.get_all(table).await?;
                    for (id, doc) in &outbound {
                        self.remote.upsert(table, id, doc).await?;
                    }
                    for id in existing.keys() {
                        if !outbound.iter().any(|(local_id, _)| local_id == id) {
                            self.remote.delete(table, id).await?;
                        }
                    }
                }
            }

            pushed += outbound.len();
        }

        let info = SyncInfo::new(compute_fingerprint(&self.store).await?);
        self.info.save(&info).await?;
        self.remote
            .upsert(REMOTE_SYNC_COLLECTION, REMOTE_SYNC_DOC_ID, &info.to_document())
            .await?;

        tracing::info!(records = pushed, "push complete");
        self.record_log(
            SyncLogEntry::new(
                SyncOperation::Push,
                LogStatus::Success,
                format!("Pushed {} records", pushed),
            )
            .with_tables(DOMAIN_TABLES),
        )
        .await;

        Ok(())
    }

    /// Mirror image of push: clears every local table and repopulates from
    /// the remote documents, then adopts the remote sync info.
    async fn pull(&self, remote_info: SyncInfo) -> Result<(), SyncError> {
        let mut pulled = 0usize;

        for table in DOMAIN_TABLES {
            let documents = self.remote.get_all(table).await?;
            self.store.clear(table).await?;

            let mut records = Vec::with_capacity(documents.len());
            for (key, doc) in documents {
                let id: i64 = key.parse().map_err(|_| {
                    SyncError::Metadata(format!(
                        "non-numeric document id '{}' in {}",
                        key, table
                    ))
                })?;
                let Value::Object(mut record) = doc else {
                    return Err(SyncError::Metadata(format!(
                        "document {}/{} is not an object",
                        table, key
                    )));
                };
                record.insert("id".to_string(), Value::from(id));
                records.push(record);
            }

            pulled += records.len();
            self.store.bulk_add(table, &records).await?;
        }

        let info = SyncInfo {
            last_update: remote_info.last_update,
            data_hash: remote_info.data_hash,
            status: SyncStatus::Idle,
        };
        self.info.save(&info).await?;

        tracing::info!(records = pulled, "pull complete");
        self.record_log(
            SyncLogEntry::new(
                SyncOperation::Pull,
                LogStatus::Success,
                format!("Pulled {} records", pulled),
            )
            .with_tables(DOMAIN_TABLES),
        )
        .await;

        Ok(())
    }

    /// Claims all pending queue entries and applies them in order. A failed
    /// entry is marked `error` and left for the next invocation; the rest
    /// keep processing.
    async fn drain_queue(&self) -> Result<(usize, usize), SyncError> {
        let entries = self.queue.pending().await?;
        let mut completed = 0usize;
        let mut failed = 0usize;

        for entry in entries {
            self.queue.mark_processing(entry.id).await?;

            match self.apply_entry(&entry).await {
                Ok(()) => {
                    self.queue.mark_completed(entry.id).await?;
                    completed += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(entry = entry.id, "queue entry failed: {}", message);
                    self.queue.mark_error(entry.id, &message).await?;
                    failed += 1;
                }
            }
        }

        Ok((completed, failed))
    }

    async fn apply_entry(&self, entry: &SyncQueueEntry) -> Result<(), SyncError> {
        for change in &entry.changes {
            let id = change.record_id.to_string();
            match change.operation {
                ChangeOp::Delete => {
                    // Unconditional: deleting an absent document is a no-op.
                    self.remote.delete(&change.table_name, &id).await?;
                }
                ChangeOp::Create | ChangeOp::Update => {
                    let record = match &change.changes {
                        Some(snapshot) => Some(snapshot.clone()),
                        None => self.store.get(&change.table_name, change.record_id).await?,
                    };
                    let Some(record) = record else {
                        return Err(SyncError::Metadata(format!(
                            "record {}/{} no longer exists and the change has no snapshot",
                            change.table_name, change.record_id
                        )));
                    };
                    let doc =
                        self.outbound_record(&change.table_name, change.record_id, &record);
                    self.remote.upsert(&change.table_name, &id, &doc).await?;
                }
            }
        }
        Ok(())
    }

    /// Normalizes one record for transmission, applying the photo
    /// degradation policy.
    fn outbound_record(&self, table: &str, id: i64, record: &Record) -> Value {
        let (prepared, dropped) = prepare_photo(record, self.compressor.as_ref());
        if let Some(e) = dropped {
            tracing::warn!(table, id, "dropping photo from outbound record: {}", e);
        }
        Value::Object(prepared)
    }

    async fn update_pending_count(&self) {
        match self.queue.pending_count().await {
            Ok(count) => self.status.set_pending_changes(count),
            Err(e) => tracing::warn!("could not read pending count: {}", e),
        }
    }

    /// Appends to the persistent log and mirrors into the status history.
    async fn record_log(&self, entry: SyncLogEntry) {
        match self.log.append(entry).await {
            Ok(entry) => self.status.append_log(entry),
            Err(e) => tracing::warn!("could not append sync log entry: {}", e),
        }
    }
}
