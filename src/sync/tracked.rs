//! Sync-aware write path for domain models.
//!
//! Domain mutations go through here so that every write both lands in the
//! local store and leaves a change entry for the next sync: write the
//! record, enqueue the table change, refresh the local fingerprint. Reads
//! go straight to the local store.

use serde_json::Value;

use super::error::SyncError;
use super::fingerprint::compute_fingerprint;
use super::meta::{SyncInfo, SyncInfoStore};
use super::queue::{ChangeQueue, TableChange};
use crate::db::{LocalStore, Record};
use crate::models::Document;

/// Write-through store that records every mutation in the change queue.
#[derive(Debug, Clone)]
pub struct TrackedStore {
    store: LocalStore,
    queue: ChangeQueue,
    info: SyncInfoStore,
}

impl TrackedStore {
    pub fn new(store: LocalStore) -> Self {
        let pool = store.pool().clone();
        Self {
            store,
            queue: ChangeQueue::new(pool.clone()),
            info: SyncInfoStore::new(pool),
        }
    }

    /// The underlying store, for reads.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn queue(&self) -> &ChangeQueue {
        &self.queue
    }

    /// Inserts a model, queues the create, and refreshes the fingerprint.
    pub async fn create<T: Document>(&self, model: &mut T) -> Result<i64, SyncError> {
        let id = self.store.insert(model).await?;
        self.queue
            .enqueue(vec![TableChange::create(T::TABLE, id, snapshot(model)?)])
            .await?;
        self.refresh_info().await?;
        Ok(id)
    }

    /// Saves a model under its existing id and queues the update.
    pub async fn update<T: Document>(&self, model: &T) -> Result<(), SyncError> {
        let id = model.id().ok_or_else(|| {
            SyncError::Metadata(format!("cannot update {} without an id", T::TABLE))
        })?;
        self.store.save(model).await?;
        self.queue
            .enqueue(vec![TableChange::update(T::TABLE, id, snapshot(model)?)])
            .await?;
        self.refresh_info().await?;
        Ok(())
    }

    /// Deletes a record and queues the delete. Returns false if the record
    /// did not exist (nothing is queued then).
    pub async fn delete<T: Document>(&self, id: i64) -> Result<bool, SyncError> {
        let existed = self.store.remove::<T>(id).await?;
        if existed {
            self.queue
                .enqueue(vec![TableChange::delete(T::TABLE, id)])
                .await?;
            self.refresh_info().await?;
        }
        Ok(existed)
    }

    /// Recomputes the local fingerprint after a domain write, so the next
    /// sync sees this side as changed and more recent.
    async fn refresh_info(&self) -> Result<(), SyncError> {
        let hash = compute_fingerprint(&self.store).await?;
        self.info.save(&SyncInfo::new(hash)).await
    }
}

fn snapshot<T: Document>(model: &T) -> Result<Record, SyncError> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        _ => Err(SyncError::Metadata(format!(
            "{} did not serialize to an object",
            T::TABLE
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{Pet, Species};
    use crate::sync::queue::ChangeOp;
    use tempfile::TempDir;

    async fn setup() -> (TrackedStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(Some(temp_dir.path().join("test.db"))).await.unwrap();
        (TrackedStore::new(LocalStore::new(pool)), temp_dir)
    }

    #[tokio::test]
    async fn test_create_queues_change_and_sets_info() {
        let (tracked, _temp) = setup().await;

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        let id = tracked.create(&mut pet).await.unwrap();

        let pending = tracked.queue().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let change = &pending[0].changes[0];
        assert_eq!(change.operation, ChangeOp::Create);
        assert_eq!(change.table_name, "pets");
        assert_eq!(change.record_id, id);
        // Snapshot carries the assigned id
        assert_eq!(
            change.changes.as_ref().unwrap()["id"],
            serde_json::json!(id)
        );

        let info = SyncInfoStore::new(tracked.store().pool().clone())
            .load()
            .await
            .unwrap();
        assert!(info.is_some());
    }

    #[tokio::test]
    async fn test_update_queues_second_change() {
        let (tracked, _temp) = setup().await;

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        tracked.create(&mut pet).await.unwrap();

        pet.name = "Rexford".to_string();
        tracked.update(&pet).await.unwrap();

        let pending = tracked.queue().pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].changes[0].operation, ChangeOp::Update);
        assert_eq!(
            pending[1].changes[0].changes.as_ref().unwrap()["name"],
            "Rexford"
        );
    }

    #[tokio::test]
    async fn test_mutations_move_the_fingerprint() {
        let (tracked, _temp) = setup().await;
        let info_store = SyncInfoStore::new(tracked.store().pool().clone());

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        tracked.create(&mut pet).await.unwrap();
        let first = info_store.load().await.unwrap().unwrap();

        pet.name = "Rexford".to_string();
        tracked.update(&pet).await.unwrap();
        let second = info_store.load().await.unwrap().unwrap();

        assert_ne!(first.data_hash, second.data_hash);
    }

    #[tokio::test]
    async fn test_delete_missing_queues_nothing() {
        let (tracked, _temp) = setup().await;

        let existed = tracked.delete::<Pet>(99).await.unwrap();
        assert!(!existed);
        assert_eq!(tracked.queue().pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_queues_delete_change() {
        let (tracked, _temp) = setup().await;

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        let id = tracked.create(&mut pet).await.unwrap();

        let existed = tracked.delete::<Pet>(id).await.unwrap();
        assert!(existed);

        let pending = tracked.queue().pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].changes[0].operation, ChangeOp::Delete);
        assert!(pending[1].changes[0].changes.is_none());
    }
}
