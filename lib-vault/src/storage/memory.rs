//! In-memory state store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::errors::{StorageError, StorageResult};
use super::StateStore;

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<Vec<u8>, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|e| StorageError::BackendError(format!("Lock poisoned: {}", e)))
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.lock()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }
}
