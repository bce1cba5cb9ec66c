//! Process-wide observable sync state.
//!
//! A derived, in-memory projection for presentation: never the source of
//! truth. It can be rebuilt at any time from the persistent sync log. The
//! store is an explicit, injectable object; observers subscribe through a
//! watch channel and receive a fresh snapshot after every mutation.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::meta::{SyncLogEntry, SyncStatus};

/// Maximum number of log entries kept in the observable history. Older
/// entries remain in the persistent sync_log table.
pub const HISTORY_LIMIT: usize = 100;

/// Snapshot of the observable sync state.
#[derive(Debug, Clone)]
pub struct SyncState {
    pub status: SyncStatus,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub pending_changes: i64,
    /// Most recent log entries, newest first.
    pub history: Vec<SyncLogEntry>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            syncing: false,
            last_sync: None,
            last_error: None,
            pending_changes: 0,
            history: Vec::new(),
        }
    }
}

/// Injectable, observable sync status store.
#[derive(Debug, Clone)]
pub struct SyncStatusStore {
    state: watch::Sender<SyncState>,
}

impl Default for SyncStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self { state }
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes. The receiver observes a snapshot after
    /// every mutation.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn set_status(&self, status: SyncStatus) {
        self.state.send_modify(|s| s.status = status);
    }

    pub fn set_syncing(&self, syncing: bool) {
        self.state.send_modify(|s| s.syncing = syncing);
    }

    pub fn set_last_sync(&self, at: DateTime<Utc>) {
        self.state.send_modify(|s| s.last_sync = Some(at));
    }

    pub fn set_last_error(&self, error: Option<String>) {
        self.state.send_modify(|s| s.last_error = error);
    }

    pub fn set_pending_changes(&self, count: i64) {
        self.state.send_modify(|s| s.pending_changes = count);
    }

    /// Prepends a log entry, dropping the oldest past the history limit.
    pub fn append_log(&self, entry: SyncLogEntry) {
        self.state.send_modify(|s| {
            s.history.insert(0, entry);
            s.history.truncate(HISTORY_LIMIT);
        });
    }

    /// Replaces the history wholesale, e.g. when rebuilding from the
    /// persistent log table. Entries are expected newest first.
    pub fn load_history(&self, entries: Vec<SyncLogEntry>) {
        self.state.send_modify(|s| {
            s.history = entries;
            s.history.truncate(HISTORY_LIMIT);
        });
    }

    pub fn clear_history(&self) {
        self.state.send_modify(|s| s.history.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::meta::{LogStatus, SyncOperation};

    fn entry(details: &str) -> SyncLogEntry {
        SyncLogEntry::new(SyncOperation::Sync, LogStatus::Success, details)
    }

    #[test]
    fn test_default_state() {
        let store = SyncStatusStore::new();
        let state = store.snapshot();

        assert_eq!(state.status, SyncStatus::Idle);
        assert!(!state.syncing);
        assert!(state.last_sync.is_none());
        assert!(state.last_error.is_none());
        assert_eq!(state.pending_changes, 0);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_mutators_update_snapshot() {
        let store = SyncStatusStore::new();

        store.set_status(SyncStatus::Syncing);
        store.set_syncing(true);
        store.set_pending_changes(4);
        store.set_last_error(Some("boom".into()));

        let state = store.snapshot();
        assert_eq!(state.status, SyncStatus::Syncing);
        assert!(state.syncing);
        assert_eq!(state.pending_changes, 4);
        assert_eq!(state.last_error.as_deref(), Some("boom"));

        store.set_last_error(None);
        assert!(store.snapshot().last_error.is_none());
    }

    #[test]
    fn test_history_is_bounded_to_most_recent_100() {
        let store = SyncStatusStore::new();

        for i in 0..150 {
            store.append_log(entry(&format!("entry {}", i)));
        }

        let history = store.snapshot().history;
        assert_eq!(history.len(), HISTORY_LIMIT);
        // Newest first; entry 149 was appended last.
        assert_eq!(history[0].details, "entry 149");
        assert_eq!(history[99].details, "entry 50");
    }

    #[test]
    fn test_clear_history() {
        let store = SyncStatusStore::new();
        store.append_log(entry("one"));
        store.clear_history();

        assert!(store.snapshot().history.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let store = SyncStatusStore::new();
        let mut rx = store.subscribe();

        store.set_status(SyncStatus::Error);
        rx.changed().await.unwrap();

        assert_eq!(rx.borrow().status, SyncStatus::Error);
    }
}
