//! Cache storage backends
//!
//! Storage is a set of named namespaces, each mapping a request key to a
//! stored response. Writes to the same key are last-write-wins; there is no
//! locking above a single entry.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::cache::request::FetchResponse;
use crate::error::Result;

/// Namespaced response storage
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    /// Names of all existing namespaces, in creation order
    async fn keys(&self) -> Result<Vec<String>>;

    /// Store `response` under `key` in `namespace`, creating the namespace
    /// if needed
    async fn put(&self, namespace: &str, key: &str, response: &FetchResponse) -> Result<()>;

    /// Look up `key` in one namespace
    async fn match_in(&self, namespace: &str, key: &str) -> Result<Option<FetchResponse>>;

    /// Look up `key` across all namespaces, oldest namespace first
    async fn match_any(&self, key: &str) -> Result<Option<FetchResponse>>;

    /// Delete a namespace and all its entries
    ///
    /// Returns whether the namespace existed.
    async fn delete(&self, namespace: &str) -> Result<bool>;
}

/// In-memory [`CacheStorage`]
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    namespaces: RwLock<Vec<(String, HashMap<String, FetchResponse>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn put(&self, namespace: &str, key: &str, response: &FetchResponse) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        match namespaces.iter_mut().find(|(name, _)| name == namespace) {
            Some((_, entries)) => {
                entries.insert(key.to_string(), response.clone());
            }
            None => {
                let mut entries = HashMap::new();
                entries.insert(key.to_string(), response.clone());
                namespaces.push((namespace.to_string(), entries));
            }
        }
        Ok(())
    }

    async fn match_in(&self, namespace: &str, key: &str) -> Result<Option<FetchResponse>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .iter()
            .find(|(name, _)| name == namespace)
            .and_then(|(_, entries)| entries.get(key).cloned()))
    }

    async fn match_any(&self, key: &str) -> Result<Option<FetchResponse>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .iter()
            .find_map(|(_, entries)| entries.get(key).cloned()))
    }

    async fn delete(&self, namespace: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.write().await;
        let before = namespaces.len();
        namespaces.retain(|(name, _)| name != namespace);
        Ok(namespaces.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryCacheStorage::new();
        let response = FetchResponse::new(StatusCode::OK, "[]");
        storage.put("app-api-v1", "GET /api/sessions", &response).await.unwrap();

        assert_eq!(
            storage.match_in("app-api-v1", "GET /api/sessions").await.unwrap(),
            Some(response.clone())
        );
        assert_eq!(storage.match_in("app-runtime-v1", "GET /api/sessions").await.unwrap(), None);
        assert_eq!(storage.match_any("GET /api/sessions").await.unwrap(), Some(response));
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_namespace() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("a", "k", &FetchResponse::new(StatusCode::OK, "first"))
            .await
            .unwrap();
        storage
            .put("b", "k", &FetchResponse::new(StatusCode::OK, "second"))
            .await
            .unwrap();
        assert_eq!(storage.match_any("k").await.unwrap().unwrap().text(), "first");
    }

    #[tokio::test]
    async fn test_delete_removes_whole_namespace() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("a", "k", &FetchResponse::new(StatusCode::OK, "x"))
            .await
            .unwrap();
        assert!(storage.delete("a").await.unwrap());
        assert!(!storage.delete("a").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
