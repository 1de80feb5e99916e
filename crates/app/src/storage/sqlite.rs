//! `SQLite` key-value store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE kv_store (
//!     key   TEXT PRIMARY KEY NOT NULL,
//!     value TEXT NOT NULL
//! );
//! ```
//!
//! The table is created on connect if it does not exist.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{KeyValueStore, StorageError};

/// Key-value store backed by a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://warranty.db` or `sqlite::memory:`),
    /// creating the database file and table if needed.
    ///
    /// A single connection is used: the store is device-local and an
    /// in-memory database is private to its connection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the URL is invalid or the
    /// database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kv_store (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            ",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        // substr comparison: `_` and `%` in prefixes are literal
        let rows = sqlx::query_as::<_, (String, String)>(
            r"
            SELECT key, value FROM kv_store
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            ",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        assert_eq!(store.get("user_id_nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_scan_prefix_treats_underscore_literally() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.set("user_id_a", "1").await.unwrap();
        store.set("userXidXb", "2").await.unwrap();

        let entries = store.scan_prefix("user_id_").await.unwrap();
        assert_eq!(entries, vec![("user_id_a".to_owned(), "1".to_owned())]);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("identity.db").display());

        let store = SqliteStore::connect(&url).await.unwrap();
        store.set("user_id_uidA", "77").await.unwrap();
        store.pool().close().await;

        let reopened = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(
            reopened.get("user_id_uidA").await.unwrap().as_deref(),
            Some("77")
        );
    }
}
