//! Local/remote synchronization: the engine, its change queue, content
//! fingerprinting, and the observable status store.
//!
//! # Model
//!
//! The local store is the primary; the remote store is its eventual mirror.
//! Domain writes go through [`TrackedStore`], which records every mutation in
//! the persistent change queue and refreshes the local fingerprint. A sync
//! pass ([`SyncEngine::synchronize`]) compares the local and remote
//! fingerprints, transfers whole datasets when they diverge (last writer
//! wins), and replays the queued changes against the remote store.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pawtrack::db::LocalStore;
//! use pawtrack::sync::{HttpRemoteStore, SyncEngine, SyncStatusStore};
//!
//! # async fn example(pool: sqlx::SqlitePool) {
//! let store = LocalStore::new(pool);
//! let remote = Arc::new(HttpRemoteStore::new(
//!     "http://localhost:8080".to_string(),
//!     "api-key".to_string(),
//! ));
//! let engine = SyncEngine::new(store, remote, SyncStatusStore::new());
//! let report = engine.synchronize().await;
//! println!("sync: {}", report.outcome);
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod memory;
pub mod meta;
pub mod photo;
pub mod queue;
pub mod remote;
pub mod status;
pub mod tracked;

pub use engine::{ReplaceStrategy, SyncEngine, SyncOutcome, SyncReport};
pub use error::SyncError;
pub use fingerprint::compute_fingerprint;
pub use memory::MemoryRemoteStore;
pub use meta::{
    LogStatus, SyncInfo, SyncInfoStore, SyncLogEntry, SyncLogStore, SyncOperation, SyncStatus,
};
pub use photo::{PhotoCompressor, PhotoError, SizeCapCompressor};
pub use queue::{ChangeOp, ChangeQueue, QueueStatus, SyncQueueEntry, TableChange};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use status::{SyncState, SyncStatusStore, HISTORY_LIMIT};
pub use tracked::TrackedStore;
