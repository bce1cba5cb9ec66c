//! Remote document store client.
//!
//! The remote side is addressed as named collections of JSON documents keyed
//! by string id. Documents hold only JSON-serializable values; timestamps
//! cross the wire as RFC 3339 strings and absent fields as explicit nulls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::SyncError;
use crate::config::SyncConfig;

/// Collection-scoped operations against the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Connectivity probe consulted before any sync work starts.
    async fn is_online(&self) -> bool;

    /// Every document in a collection, keyed by document id.
    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>, SyncError>;

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Value>, SyncError>;

    async fn upsert(&self, collection: &str, id: &str, document: &Value)
        -> Result<(), SyncError>;

    /// Removes a document. Removing an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), SyncError>;

    /// Removes every document in a collection.
    async fn clear(&self, collection: &str) -> Result<(), SyncError> {
        let ids: Vec<String> = self.get_all(collection).await?.into_keys().collect();
        for id in ids {
            self.delete(collection, &id).await?;
        }
        Ok(())
    }
}

/// HTTP client for the pawtrack server's collection API.
pub struct HttpRemoteStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Creates a client from config.
    ///
    /// Returns an error if sync is not configured.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let server_url = config
            .server_url
            .clone()
            .ok_or(SyncError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(SyncError::NotConfigured)?;

        Ok(Self::new(server_url, api_key))
    }

    pub fn new(server_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");

        Self {
            base_url: normalize_base_url(&server_url),
            api_key,
            client,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/collections/{}/{}",
            self.base_url,
            urlencoding::encode(collection),
            urlencoding::encode(id)
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(SyncError::Remote(format!(
                "{} for {}",
                response.status(),
                response.url()
            )))
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn is_online(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>, SyncError> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Value>, SyncError> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::check(response)
            .await?
            .json()
            .await
            .map(Some)
            .map_err(|e| SyncError::Remote(e.to_string()))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), SyncError> {
        let response = self
            .client
            .put(self.document_url(collection, id))
            .bearer_auth(&self.api_key)
            .json(document)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Self::check(response).await.map(|_| ())
    }

    async fn clear(&self, collection: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.collection_url(collection))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }
}

/// Ensures the base URL has a scheme and no trailing slash.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url() {
        let store = HttpRemoteStore::new(
            "http://localhost:8080".to_string(),
            "test-key".to_string(),
        );
        assert_eq!(
            store.document_url("pets", "12"),
            "http://localhost:8080/collections/pets/12"
        );
    }

    #[test]
    fn test_base_url_gets_scheme() {
        let store = HttpRemoteStore::new("localhost:8080".to_string(), "k".to_string());
        assert_eq!(
            store.collection_url("pets"),
            "http://localhost:8080/collections/pets"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let store =
            HttpRemoteStore::new("https://sync.example.com/".to_string(), "k".to_string());
        assert_eq!(
            store.collection_url("health_events"),
            "https://sync.example.com/collections/health_events"
        );
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let config = SyncConfig::default();
        assert!(matches!(
            HttpRemoteStore::from_config(&config),
            Err(SyncError::NotConfigured)
        ));
    }
}
