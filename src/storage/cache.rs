//! Sqlite-backed cache storage
//!
//! Keeps cache namespaces in the state database so offline responses
//! survive a restart. Namespace creation order is the row id order.

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::{CacheStorage, FetchResponse};
use crate::error::{CockpitError, Result};
use crate::storage::SqliteStorage;

/// [`CacheStorage`] persisted in the sqlite state database
#[derive(Debug, Clone)]
pub struct SqliteCacheStorage {
    storage: SqliteStorage,
}

impl SqliteCacheStorage {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Run `f` with a fresh connection on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = storage.connect()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CockpitError::Cache(format!("cache task failed: {}", e)))?
    }
}

fn encode_headers(headers: &HeaderMap) -> Result<String> {
    let pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    serde_json::to_string(&pairs)
        .context("Failed to serialize headers")
        .map_err(|e| CockpitError::Cache(e.to_string()).into())
}

fn decode_headers(json: &str) -> HeaderMap {
    let pairs: Vec<(String, String)> = serde_json::from_str(json).unwrap_or_default();
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

fn row_to_response(status: u16, headers: String, body: Vec<u8>) -> FetchResponse {
    FetchResponse {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
        headers: decode_headers(&headers),
        body: Bytes::from(body),
    }
}

type EntryRow = (u16, String, Vec<u8>);

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn storage_error(context: &'static str) -> impl FnOnce(rusqlite::Error) -> anyhow::Error {
    move |e| CockpitError::Cache(format!("{}: {}", context, e)).into()
}

#[async_trait::async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM cache_namespaces ORDER BY id")
                .map_err(storage_error("Failed to list namespaces"))?;
            let names = stmt
                .query_map([], |row| row.get(0))
                .map_err(storage_error("Failed to list namespaces"))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(storage_error("Failed to read namespace"))?;
            Ok(names)
        })
        .await
    }

    async fn put(&self, namespace: &str, key: &str, response: &FetchResponse) -> Result<()> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let status = response.status.as_u16();
        let headers = encode_headers(&response.headers)?;
        let body = response.body.to_vec();

        self.with_connection(move |conn| {
            let tx = conn
                .transaction()
                .map_err(storage_error("Failed to start transaction"))?;
            tx.execute(
                "INSERT OR IGNORE INTO cache_namespaces (name) VALUES (?)",
                params![namespace],
            )
            .map_err(storage_error("Failed to create namespace"))?;
            tx.execute(
                "INSERT INTO cache_entries (namespace_id, key, status, headers, body)
                 SELECT id, ?, ?, ?, ? FROM cache_namespaces WHERE name = ?
                 ON CONFLICT(namespace_id, key) DO UPDATE SET
                    status = excluded.status,
                    headers = excluded.headers,
                    body = excluded.body",
                params![key, status, headers, body, namespace],
            )
            .map_err(storage_error("Failed to store entry"))?;
            tx.commit()
                .map_err(storage_error("Failed to commit transaction"))?;
            Ok(())
        })
        .await
    }

    async fn match_in(&self, namespace: &str, key: &str) -> Result<Option<FetchResponse>> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    "SELECT e.status, e.headers, e.body FROM cache_entries e
                     JOIN cache_namespaces n ON n.id = e.namespace_id
                     WHERE n.name = ? AND e.key = ?",
                    params![namespace, key],
                    read_entry,
                )
                .optional()
                .map_err(storage_error("Failed to query entry"))?;
            Ok(row.map(|(status, headers, body)| row_to_response(status, headers, body)))
        })
        .await
    }

    async fn match_any(&self, key: &str) -> Result<Option<FetchResponse>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    "SELECT e.status, e.headers, e.body FROM cache_entries e
                     JOIN cache_namespaces n ON n.id = e.namespace_id
                     WHERE e.key = ? ORDER BY n.id LIMIT 1",
                    params![key],
                    read_entry,
                )
                .optional()
                .map_err(storage_error("Failed to query entry"))?;
            Ok(row.map(|(status, headers, body)| row_to_response(status, headers, body)))
        })
        .await
    }

    async fn delete(&self, namespace: &str) -> Result<bool> {
        let namespace = namespace.to_string();
        self.with_connection(move |conn| {
            let tx = conn
                .transaction()
                .map_err(storage_error("Failed to start transaction"))?;
            tx.execute(
                "DELETE FROM cache_entries WHERE namespace_id IN
                    (SELECT id FROM cache_namespaces WHERE name = ?)",
                params![namespace],
            )
            .map_err(storage_error("Failed to delete entries"))?;
            let removed = tx
                .execute("DELETE FROM cache_namespaces WHERE name = ?", params![namespace])
                .map_err(storage_error("Failed to delete namespace"))?;
            tx.commit()
                .map_err(storage_error("Failed to commit transaction"))?;
            Ok(removed > 0)
        })
        .await
    }
}
