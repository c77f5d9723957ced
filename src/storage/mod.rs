//! Secure credential storage.
//!
//! An opaque key/value store for the two session tokens and the locale
//! preference. The production backend is a libSQL table; tests use
//! [`MemoryCredentialStore`].

pub mod libsql_backend;

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::StorageError;

pub use libsql_backend::LibSqlCredentialStore;

/// Storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "dersimiz_access_token";
    pub const REFRESH_TOKEN: &str = "dersimiz_refresh_token";
    pub const LOCALE: &str = "dersimiz_locale";
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Access/refresh token pair.
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl Tokens {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: SecretString::from(refresh.into()),
        }
    }
}

/// Read the stored access token. Storage failures read as "no token".
pub async fn access_token(store: &dyn CredentialStore) -> Option<SecretString> {
    read_secret(store, keys::ACCESS_TOKEN).await
}

/// Read the stored refresh token. Storage failures read as "no token".
pub async fn refresh_token(store: &dyn CredentialStore) -> Option<SecretString> {
    read_secret(store, keys::REFRESH_TOKEN).await
}

async fn read_secret(store: &dyn CredentialStore, key: &str) -> Option<SecretString> {
    match store.get(key).await {
        Ok(value) => value.filter(|v| !v.is_empty()).map(SecretString::from),
        Err(e) => {
            tracing::debug!(key, error = %e, "Credential read failed");
            None
        }
    }
}

pub async fn save_tokens(store: &dyn CredentialStore, tokens: &Tokens) -> Result<(), StorageError> {
    store
        .set(keys::ACCESS_TOKEN, tokens.access.expose_secret())
        .await?;
    store
        .set(keys::REFRESH_TOKEN, tokens.refresh.expose_secret())
        .await
}

pub async fn clear_tokens(store: &dyn CredentialStore) -> Result<(), StorageError> {
    store.delete(keys::ACCESS_TOKEN).await?;
    store.delete(keys::REFRESH_TOKEN).await?;
    Ok(())
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}
