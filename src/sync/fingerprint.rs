//! Content fingerprinting for cheap divergence detection.
//!
//! Both store sides keep a SHA-256 digest of their whole dataset; comparing
//! digests decides whether a sync has to move data at all. The digest is
//! computed over a canonical serialization: tables keyed by sorted name,
//! records sorted by id, field keys sorted within each record. Two stores
//! holding the same records therefore always hash identically, no matter in
//! which order the rows were written.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::db::{LocalStore, StoreError, DOMAIN_TABLES};

/// Computes the fingerprint of every domain table in the store.
///
/// Sync metadata tables are excluded; they describe the sync itself and must
/// not feed back into the digest.
pub async fn compute_fingerprint(store: &LocalStore) -> Result<String, StoreError> {
    let mut dataset: BTreeMap<&str, Vec<Value>> = BTreeMap::new();

    for table in DOMAIN_TABLES {
        // all() returns records ordered by id; serde_json maps keep field
        // keys sorted, and BTreeMap keeps table names sorted.
        let records = store.all(table).await?;
        dataset.insert(table, records.into_iter().map(Value::Object).collect());
    }

    let canonical = serde_json::to_string(&dataset)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, Record};
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(Some(temp_dir.path().join("test.db"))).await.unwrap();
        (LocalStore::new(pool), temp_dir)
    }

    fn record(value: serde_json::Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_fingerprint_is_lowercase_hex() {
        let (store, _temp) = setup().await;
        let hash = compute_fingerprint(&store).await.unwrap();

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_same_records_same_fingerprint_regardless_of_insertion_order() {
        let (store_a, _ta) = setup().await;
        let (store_b, _tb) = setup().await;

        let rex = record(json!({"id": 1, "name": "Rex"}));
        let misha = record(json!({"id": 2, "name": "Misha"}));

        store_a
            .bulk_add("pets", &[rex.clone(), misha.clone()])
            .await
            .unwrap();
        // Other store writes the same rows in reverse order.
        store_b.bulk_add("pets", &[misha, rex]).await.unwrap();

        let hash_a = compute_fingerprint(&store_a).await.unwrap();
        let hash_b = compute_fingerprint(&store_b).await.unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[tokio::test]
    async fn test_fingerprint_changes_when_record_added() {
        let (store, _temp) = setup().await;

        let before = compute_fingerprint(&store).await.unwrap();
        store
            .add("pets", &record(json!({"name": "Rex"})))
            .await
            .unwrap();
        let after = compute_fingerprint(&store).await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_changes_when_field_changes() {
        let (store, _temp) = setup().await;

        let id = store
            .add("pets", &record(json!({"name": "Rex"})))
            .await
            .unwrap();
        let before = compute_fingerprint(&store).await.unwrap();

        store
            .update("pets", id, &record(json!({"name": "Rexford"})))
            .await
            .unwrap();
        let after = compute_fingerprint(&store).await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_changes_when_record_removed() {
        let (store, _temp) = setup().await;

        let id = store
            .add("foods", &record(json!({"name": "Kibble"})))
            .await
            .unwrap();
        let before = compute_fingerprint(&store).await.unwrap();

        store.delete("foods", id).await.unwrap();
        let after = compute_fingerprint(&store).await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_same_after_mutation_history_converges() {
        let (store_a, _ta) = setup().await;
        let (store_b, _tb) = setup().await;

        // Store A gets there by insert + update, store B by direct insert.
        let id = store_a
            .add("pets", &record(json!({"name": "Rex"})))
            .await
            .unwrap();
        store_a
            .update("pets", id, &record(json!({"name": "Rexford"})))
            .await
            .unwrap();

        store_b
            .bulk_add("pets", &[record(json!({"id": id, "name": "Rexford"}))])
            .await
            .unwrap();

        assert_eq!(
            compute_fingerprint(&store_a).await.unwrap(),
            compute_fingerprint(&store_b).await.unwrap()
        );
    }
}
