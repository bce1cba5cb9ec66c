//! Generic document access to the local SQLite tables.
//!
//! Every domain table has the same shape: an integer primary key and a JSON
//! payload. The store hands records out as JSON maps with the row id injected
//! under the `"id"` key, and strips that key again on the way in so the
//! payload never duplicates the primary key.

use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::models::Document;

/// A record as stored in a domain table: field name -> JSON value.
pub type Record = Map<String, Value>;

/// Domain tables, in sync order. Sync metadata tables are not listed here.
pub const DOMAIN_TABLES: [&str; 6] = [
    "pets",
    "weights",
    "treatments",
    "groomings",
    "health_events",
    "foods",
];

/// Errors from local store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Table name is not one of the known domain tables.
    UnknownTable(String),
    /// Underlying SQLite error.
    Sqlite(sqlx::Error),
    /// Record payload could not be serialized or parsed.
    Json(serde_json::Error),
    /// A model did not serialize to a JSON object.
    InvalidDocument(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownTable(t) => write!(f, "Unknown table: {}", t),
            StoreError::Sqlite(e) => write!(f, "Database error: {}", e),
            StoreError::Json(e) => write!(f, "Invalid record payload: {}", e),
            StoreError::InvalidDocument(m) => write!(f, "Invalid document: {}", m),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Document-oriented access to the local database.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for callers that need their own transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn check_table(table: &str) -> Result<(), StoreError> {
        if DOMAIN_TABLES.contains(&table) {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.to_string()))
        }
    }

    fn parse_row(id: i64, data: &str) -> Result<Record, StoreError> {
        let mut record: Record = serde_json::from_str(data)?;
        record.insert("id".to_string(), Value::from(id));
        Ok(record)
    }

    fn payload(record: &Record) -> Result<String, StoreError> {
        let mut copy = record.clone();
        copy.remove("id");
        Ok(serde_json::to_string(&Value::Object(copy))?)
    }

    /// All records in a table, ordered by id ascending.
    pub async fn all(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        Self::check_table(table)?;

        let rows: Vec<(i64, String)> =
            sqlx::query_as(&format!("SELECT id, data FROM {} ORDER BY id", table))
                .fetch_all(&self.pool)
                .await?;

        rows.iter()
            .map(|(id, data)| Self::parse_row(*id, data))
            .collect()
    }

    pub async fn get(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError> {
        Self::check_table(table)?;

        let row: Option<(i64, String)> =
            sqlx::query_as(&format!("SELECT id, data FROM {} WHERE id = ?", table))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((id, data)) => Self::parse_row(id, &data).map(Some),
            None => Ok(None),
        }
    }

    /// Inserts a record and returns the store-assigned id.
    pub async fn add(&self, table: &str, record: &Record) -> Result<i64, StoreError> {
        Self::check_table(table)?;

        let payload = Self::payload(record)?;
        let result = sqlx::query(&format!("INSERT INTO {} (data) VALUES (?)", table))
            .bind(&payload)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts many records in one transaction, preserving explicit ids.
    ///
    /// Records whose `"id"` field is an integer keep that id; the rest get
    /// store-assigned ids. Used by pull to mirror remote identifiers.
    pub async fn bulk_add(&self, table: &str, records: &[Record]) -> Result<(), StoreError> {
        Self::check_table(table)?;

        let mut tx = self.pool.begin().await?;
        for record in records {
            let payload = Self::payload(record)?;
            match record.get("id").and_then(Value::as_i64) {
                Some(id) => {
                    sqlx::query(&format!("INSERT INTO {} (id, data) VALUES (?, ?)", table))
                        .bind(id)
                        .bind(&payload)
                        .execute(&mut *tx)
                        .await?;
                }
                None => {
                    sqlx::query(&format!("INSERT INTO {} (data) VALUES (?)", table))
                        .bind(&payload)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        Ok(())
    }

    /// Writes a full document under an explicit id, inserting or replacing.
    pub async fn put(&self, table: &str, id: i64, record: &Record) -> Result<(), StoreError> {
        Self::check_table(table)?;

        let payload = Self::payload(record)?;
        sqlx::query(&format!(
            "INSERT INTO {} (id, data) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            table
        ))
        .bind(id)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Merges the given fields into an existing record.
    ///
    /// Returns false if no record with that id exists.
    pub async fn update(
        &self,
        table: &str,
        id: i64,
        partial: &Record,
    ) -> Result<bool, StoreError> {
        Self::check_table(table)?;

        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> =
            sqlx::query_as(&format!("SELECT data FROM {} WHERE id = ?", table))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((data,)) = row else {
            return Ok(false);
        };

        let mut record: Record = serde_json::from_str(&data)?;
        for (key, value) in partial {
            if key == "id" {
                continue;
            }
            record.insert(key.clone(), value.clone());
        }

        let payload = serde_json::to_string(&Value::Object(record))?;
        sqlx::query(&format!("UPDATE {} SET data = ? WHERE id = ?", table))
            .bind(&payload)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Deletes a record. Returns false if it did not exist.
    pub async fn delete(&self, table: &str, id: i64) -> Result<bool, StoreError> {
        Self::check_table(table)?;

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self, table: &str) -> Result<(), StoreError> {
        Self::check_table(table)?;

        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count(&self, table: &str) -> Result<i64, StoreError> {
        Self::check_table(table)?;

        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Records whose indexed field equals the given value, ordered by id.
    pub async fn find_eq(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        Self::check_table(table)?;

        let sql = format!(
            "SELECT id, data FROM {} WHERE json_extract(data, ?) = ? ORDER BY id",
            table
        );
        let path = format!("$.{}", field);

        let query = sqlx::query_as::<_, (i64, String)>(&sql).bind(path);
        let query = match value {
            Value::String(s) => query.bind(s.clone()),
            Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap()),
            Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
            Value::Bool(b) => query.bind(*b),
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "unsupported query value: {}",
                    other
                )))
            }
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|(id, data)| Self::parse_row(*id, data))
            .collect()
    }

    // ========== Typed access for domain models ==========

    fn to_record<T: Document>(model: &T) -> Result<Record, StoreError> {
        match serde_json::to_value(model)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::InvalidDocument(format!(
                "{} did not serialize to an object",
                T::TABLE
            ))),
        }
    }

    fn from_record<T: Document>(record: Record) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    /// Inserts a model and stamps the assigned id onto it.
    pub async fn insert<T: Document>(&self, model: &mut T) -> Result<i64, StoreError> {
        let record = Self::to_record(model)?;
        let id = self.add(T::TABLE, &record).await?;
        model.set_id(id);
        Ok(id)
    }

    pub async fn fetch<T: Document>(&self, id: i64) -> Result<Option<T>, StoreError> {
        match self.get(T::TABLE, id).await? {
            Some(record) => Self::from_record(record).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        self.all(T::TABLE)
            .await?
            .into_iter()
            .map(Self::from_record)
            .collect()
    }

    /// Writes a model back under its existing id.
    pub async fn save<T: Document>(&self, model: &T) -> Result<(), StoreError> {
        let id = model.id().ok_or_else(|| {
            StoreError::InvalidDocument(format!("cannot save {} without an id", T::TABLE))
        })?;
        let record = Self::to_record(model)?;
        self.put(T::TABLE, id, &record).await
    }

    pub async fn remove<T: Document>(&self, id: i64) -> Result<bool, StoreError> {
        self.delete(T::TABLE, id).await
    }

    pub async fn find_by<T: Document>(
        &self,
        field: &str,
        value: &Value,
    ) -> Result<Vec<T>, StoreError> {
        self.find_eq(T::TABLE, field, value)
            .await?
            .into_iter()
            .map(Self::from_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{Pet, Species, WeightEntry};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(Some(db_path)).await.unwrap();
        (LocalStore::new(pool), temp_dir)
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_add_assigns_ids_in_order() {
        let (store, _temp) = setup().await;

        let first = store
            .add("pets", &record(json!({"name": "Rex"})))
            .await
            .unwrap();
        let second = store
            .add("pets", &record(json!({"name": "Misha"})))
            .await
            .unwrap();

        assert!(second > first);

        let all = store.all("pets").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].get("id").unwrap(), &Value::from(first));
        assert_eq!(all[0].get("name").unwrap(), "Rex");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _temp) = setup().await;
        assert!(store.get("pets", 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_table_rejected() {
        let (store, _temp) = setup().await;
        let result = store.all("sync_queue").await;
        assert!(matches!(result, Err(StoreError::UnknownTable(_))));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (store, _temp) = setup().await;

        let id = store
            .add("pets", &record(json!({"name": "Rex", "breed": "Beagle"})))
            .await
            .unwrap();

        let found = store
            .update("pets", id, &record(json!({"breed": "Mix"})))
            .await
            .unwrap();
        assert!(found);

        let pet = store.get("pets", id).await.unwrap().unwrap();
        assert_eq!(pet.get("name").unwrap(), "Rex");
        assert_eq!(pet.get("breed").unwrap(), "Mix");
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let (store, _temp) = setup().await;
        let found = store
            .update("pets", 9, &record(json!({"name": "x"})))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn test_bulk_add_preserves_explicit_ids() {
        let (store, _temp) = setup().await;

        let records = vec![
            record(json!({"id": 7, "name": "Rex"})),
            record(json!({"id": 12, "name": "Misha"})),
        ];
        store.bulk_add("pets", &records).await.unwrap();

        let all = store.all("pets").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].get("id").unwrap(), &Value::from(7));
        assert_eq!(all[1].get("id").unwrap(), &Value::from(12));
    }

    #[tokio::test]
    async fn test_put_replaces_whole_document() {
        let (store, _temp) = setup().await;

        let id = store
            .add("pets", &record(json!({"name": "Rex", "breed": "Beagle"})))
            .await
            .unwrap();

        store
            .put("pets", id, &record(json!({"name": "Rex II"})))
            .await
            .unwrap();

        let pet = store.get("pets", id).await.unwrap().unwrap();
        assert_eq!(pet.get("name").unwrap(), "Rex II");
        assert!(pet.get("breed").is_none());
    }

    #[tokio::test]
    async fn test_clear_empties_table() {
        let (store, _temp) = setup().await;

        store
            .add("foods", &record(json!({"name": "Kibble"})))
            .await
            .unwrap();
        store.clear("foods").await.unwrap();

        assert_eq!(store.count("foods").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_eq_by_integer_field() {
        let (store, _temp) = setup().await;

        store
            .add("weights", &record(json!({"pet_id": 1, "weight_kg": 4.2})))
            .await
            .unwrap();
        store
            .add("weights", &record(json!({"pet_id": 2, "weight_kg": 11.0})))
            .await
            .unwrap();
        store
            .add("weights", &record(json!({"pet_id": 1, "weight_kg": 4.4})))
            .await
            .unwrap();

        let found = store
            .find_eq("weights", "pet_id", &Value::from(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_typed_insert_and_fetch() {
        let (store, _temp) = setup().await;

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        let id = store.insert(&mut pet).await.unwrap();
        assert_eq!(pet.id, Some(id));

        let fetched: Pet = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Rex");
        assert_eq!(fetched.id, Some(id));
    }

    #[tokio::test]
    async fn test_typed_save_overwrites() {
        let (store, _temp) = setup().await;

        let mut pet = Pet::new("Rex", Species::Dog, "user1");
        store.insert(&mut pet).await.unwrap();

        pet.name = "Rexford".to_string();
        store.save(&pet).await.unwrap();

        let fetched: Pet = store.fetch(pet.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Rexford");
    }

    #[tokio::test]
    async fn test_typed_find_by_pet() {
        let (store, _temp) = setup().await;

        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut w1 = WeightEntry::new(1, date, 4.2);
        let mut w2 = WeightEntry::new(2, date, 11.0);
        store.insert(&mut w1).await.unwrap();
        store.insert(&mut w2).await.unwrap();

        let weights: Vec<WeightEntry> =
            store.find_by("pet_id", &Value::from(1)).await.unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].weight_kg, 4.2);
    }
}
