//! Key-value storage capability for guest carts.
//!
//! The guest cart needs exactly three operations (get/set/remove by key). In
//! production the guest's session is the store; tests and local tooling use
//! [`MemoryStore`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The session layer failed to load or save.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The store is not reachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl KeyValueStore for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(Self::get::<String>(self, key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        Ok(self.insert(key, value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_value(key).await?;
        Ok(())
    }
}

/// In-process [`KeyValueStore`].
///
/// Clones share the same entries. [`MemoryStore::set_offline`] makes every
/// operation fail, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: HashMap<String, String>,
    offline: bool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated unavailability.
    pub async fn set_offline(&self, offline: bool) {
        self.inner.lock().await.offline = offline;
    }

    /// Snapshot of the raw value under `key`, ignoring the offline flag.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.lock().await.entries.get(key).cloned()
    }
}

impl MemoryStoreInner {
    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline {
            return Err(StorageError::Unavailable("memory store is offline".to_owned()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let inner = self.inner.lock().await;
        inner.check_online()?;
        Ok(inner.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check_online()?;
        inner.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check_online()?;
        inner.entries.remove(key);
        Ok(())
    }
}
