//! In-memory key-value storage.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use claw_master_core::traits::{KeyValueStore, StorageError};
use serde_json::Value;

/// In-memory storage implementation.
///
/// Useful for tests and throwaway dashboards.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save/remove calls served so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored entry.
    ///
    /// # Errors
    /// Returns error if the lock is poisoned.
    pub fn snapshot(&self) -> Result<HashMap<String, Value>, StorageError> {
        Ok(self
            .entries
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .clone())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .entries
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(key)
            .cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .remove(key);
        Ok(())
    }
}
