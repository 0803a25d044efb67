use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use storage::KeyValueStore;
use tokio::sync::{broadcast, Mutex};

use crate::error::StoreError;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A single value bound to one durable storage key.
///
/// The value is loaded lazily on first access and cached afterwards. Every write goes to
/// durable storage before the cached value is swapped, so a failed write leaves the old
/// value both visible and persisted. Writes on one instance are serialized by the cache
/// lock; separate processes sharing the same storage are not coordinated.
pub struct PersistedState<T> {
    key: String,
    store: Arc<dyn KeyValueStore>,
    default: T,
    current: Mutex<Option<T>>,
    changes: broadcast::Sender<T>,
}

impl<T> PersistedState<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            key: key.into(),
            store,
            default,
            current: Mutex::new(None),
            changes,
        }
    }

    pub async fn read(&self) -> Result<T, StoreError> {
        let mut current = self.current.lock().await;
        self.current_locked(&mut current).await
    }

    pub async fn write(&self, value: T) -> Result<(), StoreError> {
        let mut current = self.current.lock().await;
        self.commit_locked(&mut current, value).await
    }

    /// Read-modify-write under the write lock. The closure works on a copy; nothing is
    /// persisted or published when it returns an error.
    pub async fn update<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E> + Send,
        R: Send,
        E: From<StoreError> + Send,
    {
        let mut current = self.current.lock().await;
        let mut next = self.current_locked(&mut current).await?;
        let outcome = f(&mut next)?;
        self.commit_locked(&mut current, next).await?;
        Ok(outcome)
    }

    /// Receives every value committed after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.changes.subscribe()
    }

    async fn current_locked(&self, slot: &mut Option<T>) -> Result<T, StoreError> {
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }

        let value = self.load().await?;
        *slot = Some(value.clone());
        Ok(value)
    }

    async fn load(&self) -> Result<T, StoreError> {
        let raw = self
            .store
            .get(&self.key)
            .await
            .map_err(|source| StoreError::Backend {
                key: self.key.clone(),
                source,
            })?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: self.key.clone(),
                source,
            }),
            None => {
                tracing::debug!(key = %self.key, "no persisted value; using default");
                Ok(self.default.clone())
            }
        }
    }

    async fn commit_locked(&self, slot: &mut Option<T>, value: T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&value).map_err(|source| StoreError::Encode {
            key: self.key.clone(),
            source,
        })?;

        if let Err(source) = self.store.set(&self.key, &encoded).await {
            tracing::error!(key = %self.key, error = %source, "failed to persist value");
            return Err(StoreError::Backend {
                key: self.key.clone(),
                source,
            });
        }

        *slot = Some(value.clone());
        // No subscribers is fine; the value is already committed.
        let _ = self.changes.send(value);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/persisted_tests.rs"]
mod tests;
