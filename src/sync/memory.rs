//! In-memory remote store, used by tests and offline development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::error::SyncError;
use super::remote::RemoteStore;

/// A remote store held entirely in memory.
///
/// Supports failure injection (poisoned documents whose writes error) and
/// counts write operations, so tests can assert on churn.
#[derive(Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    online: AtomicBool,
    writes: AtomicUsize,
    poisoned: Mutex<BTreeSet<(String, String)>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
            poisoned: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of upsert/delete operations performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every write to the given document fail.
    pub fn poison(&self, collection: &str, id: &str) {
        self.poisoned
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()));
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check_poison(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        let poisoned = self.poisoned.lock().unwrap();
        if poisoned.contains(&(collection.to_string(), id.to_string())) {
            Err(SyncError::Remote(format!(
                "injected failure for {}/{}",
                collection, id
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>, SyncError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Value>, SyncError> {
        Ok(self.document(collection, id))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), SyncError> {
        self.check_poison(collection, id)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        self.check_poison(collection, id)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn clear(&self, collection: &str) -> Result<(), SyncError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.collections.lock().unwrap().remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_get_delete() {
        let store = MemoryRemoteStore::new();

        store
            .upsert("pets", "1", &json!({"name": "Rex"}))
            .await
            .unwrap();
        assert_eq!(
            store.get_one("pets", "1").await.unwrap().unwrap()["name"],
            "Rex"
        );

        store.delete("pets", "1").await.unwrap();
        assert!(store.get_one("pets", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poisoned_write_fails() {
        let store = MemoryRemoteStore::new();
        store.poison("pets", "1");

        let result = store.upsert("pets", "1", &json!({})).await;
        assert!(matches!(result, Err(SyncError::Remote(_))));

        // Other documents are unaffected
        store.upsert("pets", "2", &json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_count() {
        let store = MemoryRemoteStore::new();
        store.upsert("pets", "1", &json!({})).await.unwrap();
        store.delete("pets", "1").await.unwrap();
        assert_eq!(store.write_count(), 2);
    }
}
