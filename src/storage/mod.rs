use crate::config::StorageConfig;
use crate::error::{CockpitError, Result};
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod cache;
pub use cache::SqliteCacheStorage;

/// Sqlite database holding the persisted client state and, optionally, the
/// offline cache
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("dev", "cockpit", "cockpit")
            .ok_or_else(|| CockpitError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| CockpitError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("state.db"))
    }

    /// Open the database named by `config`, or the default one
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match &config.state_db {
            Some(path) => Self::new_with_path(path),
            None => Self::new(),
        }
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use cockpit::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("state.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| CockpitError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| CockpitError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cache_namespaces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace_id INTEGER NOT NULL
                    REFERENCES cache_namespaces(id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers JSON NOT NULL,
                body BLOB NOT NULL,
                PRIMARY KEY (namespace_id, key)
            );",
        )
        .context("Failed to create tables")
        .map_err(|e| CockpitError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Save `value` as JSON under `key`, replacing any previous value
    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.connect()?;
        let json = serde_json::to_string(value)
            .context("Failed to serialize value")
            .map_err(|e| CockpitError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, now],
        )
        .context("Failed to save value")
        .map_err(|e| CockpitError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load the JSON value stored under `key`
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.connect()?;

        let json: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to query value")
            .map_err(|e| CockpitError::Storage(e.to_string()))?;

        match json {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .context("Failed to deserialize value")
                    .map_err(|e| CockpitError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Remove the value stored under `key`
    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM kv WHERE key = ?", params![key])
            .context("Failed to delete value")
            .map_err(|e| CockpitError::Storage(e.to_string()))?;
        Ok(())
    }
}
