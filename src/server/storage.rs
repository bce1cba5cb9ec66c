//! Server-side document storage.
//!
//! Documents are stored per group in the following structure:
//! ```text
//! <DATA_DIR>/
//!   <group_id>/
//!     pets.json
//!     weights.json
//!     sync.json
//! ```
//! Each file holds one collection: a JSON object mapping document id to
//! document. Writes go through a temp file and rename, and a process-wide
//! lock serializes read-modify-write cycles.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Error parsing a collection file.
    JsonError(PathBuf, serde_json::Error),
    /// Invalid group ID (e.g., contains path separators).
    InvalidGroupId(String),
    /// Invalid collection name.
    InvalidCollection(String),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::JsonError(path, e) => {
                write!(f, "Failed to parse collection {}: {}", path.display(), e)
            }
            ServerStorageError::InvalidGroupId(id) => {
                write!(f, "Invalid group ID: {}", id)
            }
            ServerStorageError::InvalidCollection(name) => {
                write!(f, "Invalid collection name: {}", name)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::JsonError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// File-backed store of document collections, one directory per group.
#[derive(Debug)]
pub struct CollectionStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl CollectionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Validates a path segment to prevent traversal.
    fn validate_segment(segment: &str) -> bool {
        !segment.is_empty()
            && !segment.contains('/')
            && !segment.contains('\\')
            && !segment.contains("..")
            && !segment.starts_with('.')
    }

    fn collection_path(
        &self,
        group_id: &str,
        collection: &str,
    ) -> Result<PathBuf, ServerStorageError> {
        if !Self::validate_segment(group_id) {
            return Err(ServerStorageError::InvalidGroupId(group_id.to_string()));
        }
        if !Self::validate_segment(collection) {
            return Err(ServerStorageError::InvalidCollection(
                collection.to_string(),
            ));
        }
        Ok(self
            .data_dir
            .join(group_id)
            .join(format!("{}.json", collection)))
    }

    fn read(&self, path: &PathBuf) -> Result<BTreeMap<String, Value>, ServerStorageError> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| ServerStorageError::JsonError(path.clone(), e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ServerStorageError::IoError(path.clone(), e)),
        }
    }

    fn write(
        &self,
        path: &PathBuf,
        documents: &BTreeMap<String, Value>,
    ) -> Result<(), ServerStorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
        }

        let contents = serde_json::to_string_pretty(documents)
            .map_err(|e| ServerStorageError::JsonError(path.clone(), e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(|e| ServerStorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, path).map_err(|e| ServerStorageError::IoError(path.clone(), e))?;

        Ok(())
    }

    /// Every document in a collection.
    pub fn get_all(
        &self,
        group_id: &str,
        collection: &str,
    ) -> Result<BTreeMap<String, Value>, ServerStorageError> {
        let path = self.collection_path(group_id, collection)?;
        let _guard = self.lock.lock().unwrap();
        self.read(&path)
    }

    pub fn get_one(
        &self,
        group_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, ServerStorageError> {
        Ok(self.get_all(group_id, collection)?.remove(id))
    }

    pub fn upsert(
        &self,
        group_id: &str,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), ServerStorageError> {
        let path = self.collection_path(group_id, collection)?;
        let _guard = self.lock.lock().unwrap();

        let mut documents = self.read(&path)?;
        documents.insert(id.to_string(), document);
        self.write(&path, &documents)
    }

    /// Removes one document. Returns false if it was absent.
    pub fn delete(
        &self,
        group_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<bool, ServerStorageError> {
        let path = self.collection_path(group_id, collection)?;
        let _guard = self.lock.lock().unwrap();

        let mut documents = self.read(&path)?;
        let existed = documents.remove(id).is_some();
        if existed {
            self.write(&path, &documents)?;
        }
        Ok(existed)
    }

    /// Removes every document in a collection.
    pub fn clear(&self, group_id: &str, collection: &str) -> Result<(), ServerStorageError> {
        let path = self.collection_path(group_id, collection)?;
        let _guard = self.lock.lock().unwrap();
        self.write(&path, &BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (CollectionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (CollectionStore::new(temp_dir.path()), temp_dir)
    }

    #[test]
    fn test_empty_collection_reads_empty() {
        let (store, _temp) = setup();
        let docs = store.get_all("family1", "pets").unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_upsert_and_get() {
        let (store, _temp) = setup();

        store
            .upsert("family1", "pets", "1", json!({"name": "Rex"}))
            .unwrap();

        let doc = store.get_one("family1", "pets", "1").unwrap().unwrap();
        assert_eq!(doc["name"], "Rex");

        // Upsert replaces
        store
            .upsert("family1", "pets", "1", json!({"name": "Rexford"}))
            .unwrap();
        let doc = store.get_one("family1", "pets", "1").unwrap().unwrap();
        assert_eq!(doc["name"], "Rexford");
    }

    #[test]
    fn test_groups_are_isolated() {
        let (store, _temp) = setup();

        store
            .upsert("family1", "pets", "1", json!({"name": "Rex"}))
            .unwrap();

        assert!(store.get_one("family2", "pets", "1").unwrap().is_none());
    }

    #[test]
    fn test_delete_absent_returns_false() {
        let (store, _temp) = setup();
        assert!(!store.delete("family1", "pets", "42").unwrap());
    }

    #[test]
    fn test_clear_empties_collection() {
        let (store, _temp) = setup();

        store
            .upsert("family1", "pets", "1", json!({"name": "Rex"}))
            .unwrap();
        store
            .upsert("family1", "pets", "2", json!({"name": "Misha"}))
            .unwrap();
        store.clear("family1", "pets").unwrap();

        assert!(store.get_all("family1", "pets").unwrap().is_empty());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (store, _temp) = setup();

        assert!(matches!(
            store.get_all("../evil", "pets"),
            Err(ServerStorageError::InvalidGroupId(_))
        ));
        assert!(matches!(
            store.get_all("family1", "../../etc"),
            Err(ServerStorageError::InvalidCollection(_))
        ));
    }

    #[test]
    fn test_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = CollectionStore::new(temp_dir.path());
            store
                .upsert("family1", "pets", "1", json!({"name": "Rex"}))
                .unwrap();
        }

        let store = CollectionStore::new(temp_dir.path());
        assert_eq!(store.get_all("family1", "pets").unwrap().len(), 1);
    }
}
