//! Durable local key-value storage.
//!
//! Identity assignment needs `get`, `set` and a prefix scan on string keys.
//! Two durable adapters back [`Store`], chosen from [`StorageConfig`]:
//!
//! - [`FileStore`] - a JSON object file, rewritten atomically on each `set`
//! - [`SqliteStore`] - a single `kv_store` table in a `SQLite` database
//!
//! [`MemoryStore`] is a process-local map for tests and throwaway sessions.

use std::future::Future;

use thiserror::Error;

use crate::config::StorageConfig;

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// String key-value storage that survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// All entries whose key starts with `prefix`, ordered by key.
    fn scan_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<(String, String)>, StorageError>> + Send;
}

/// Durable storage adapter selected at runtime.
#[derive(Debug)]
pub enum Store {
    /// JSON file.
    File(FileStore),
    /// `SQLite` database.
    Sqlite(SqliteStore),
}

impl Store {
    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the `SQLite` database cannot be opened.
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        match config {
            StorageConfig::File(path) => Ok(Self::File(FileStore::new(path))),
            StorageConfig::Sqlite(url) => Ok(Self::Sqlite(SqliteStore::connect(url).await?)),
        }
    }
}

impl KeyValueStore for Store {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::File(store) => store.get(key).await,
            Self::Sqlite(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::File(store) => store.set(key, value).await,
            Self::Sqlite(store) => store.set(key, value).await,
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        match self {
            Self::File(store) => store.scan_prefix(prefix).await,
            Self::Sqlite(store) => store.scan_prefix(prefix).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        let store = Store::open(&StorageConfig::File(path.clone())).await.unwrap();
        assert!(matches!(store, Store::File(_)));

        store.set("user_id_a", "12").await.unwrap();
        assert_eq!(store.get("user_id_a").await.unwrap().as_deref(), Some("12"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let store = Store::open(&StorageConfig::Sqlite("sqlite::memory:".to_owned()))
            .await
            .unwrap();
        assert!(matches!(store, Store::Sqlite(_)));

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_scan_prefix_through_store() {
        let store = Store::open(&StorageConfig::Sqlite("sqlite::memory:".to_owned()))
            .await
            .unwrap();
        store.set("user_id_b", "2").await.unwrap();
        store.set("account_key_owner_2", "b").await.unwrap();
        store.set("user_id_a", "1").await.unwrap();

        let entries = store.scan_prefix("user_id_").await.unwrap();
        assert_eq!(
            entries,
            vec![
                ("user_id_a".to_owned(), "1".to_owned()),
                ("user_id_b".to_owned(), "2".to_owned()),
            ]
        );
    }
}
