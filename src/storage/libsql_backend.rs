//! libSQL-backed credential store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use super::CredentialStore;
use crate::error::StorageError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS credentials (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Credential store over a single libSQL connection.
pub struct LibSqlCredentialStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlCredentialStore {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open libSQL database: {e}")))?;
        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Credential store opened");
        Ok(store)
    }

    /// In-memory database.
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StorageError::Open(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;
        conn.execute(SCHEMA, ())
            .await
            .map_err(|e| StorageError::Open(format!("schema: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl CredentialStore for LibSqlCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut rows = self
            .conn
            .query("SELECT value FROM credentials WHERE key = ?1", params![key])
            .await
            .map_err(|e| StorageError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| StorageError::Query(format!("get: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Query(format!("get: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| StorageError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let count = self
            .conn
            .execute("DELETE FROM credentials WHERE key = ?1", params![key])
            .await
            .map_err(|e| StorageError::Query(format!("delete: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys;

    #[tokio::test]
    async fn crud() {
        let store = LibSqlCredentialStore::new_memory().await.unwrap();

        assert!(store.get(keys::LOCALE).await.unwrap().is_none());

        store.set(keys::LOCALE, "tr").await.unwrap();
        assert_eq!(store.get(keys::LOCALE).await.unwrap().as_deref(), Some("tr"));

        // Upsert
        store.set(keys::LOCALE, "en").await.unwrap();
        assert_eq!(store.get(keys::LOCALE).await.unwrap().as_deref(), Some("en"));

        assert!(store.delete(keys::LOCALE).await.unwrap());
        assert!(store.get(keys::LOCALE).await.unwrap().is_none());
        assert!(!store.delete(keys::LOCALE).await.unwrap());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("creds.db");

        {
            let store = LibSqlCredentialStore::new_local(&path).await.unwrap();
            store.set(keys::ACCESS_TOKEN, "abc").await.unwrap();
        }

        let store = LibSqlCredentialStore::new_local(&path).await.unwrap();
        assert_eq!(
            store.get(keys::ACCESS_TOKEN).await.unwrap().as_deref(),
            Some("abc")
        );
    }
}
