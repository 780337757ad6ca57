//! Durable state store backed by a sled tree

use std::path::Path;
use std::sync::Arc;

use super::errors::{StorageError, StorageResult};
use super::StateStore;

/// Default tree holding vault state
pub const DEFAULT_TREE: &str = "vault";

/// Persistent store over one sled tree
///
/// The vault keeps its segments in a dedicated tree so the database can be
/// shared with other host data.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`
    ///
    /// # Errors
    /// Returns `StorageError::BackendError` if the database cannot be opened
    pub fn open(path: impl AsRef<Path>, tree_name: Option<&str>) -> StorageResult<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| StorageError::BackendError(e.to_string()))?;
        Self::with_db(Arc::new(db), tree_name)
    }

    /// Use a tree of an already open database
    pub fn with_db(db: Arc<sled::Db>, tree_name: Option<&str>) -> StorageResult<Self> {
        let tree = db
            .open_tree(tree_name.unwrap_or(DEFAULT_TREE).as_bytes())
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Ok(Self { db, tree })
    }

    /// Throwaway database removed on drop
    pub fn temporary() -> StorageResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Self::with_db(Arc::new(db), None)
    }

    pub fn entries(&self) -> usize {
        self.tree.len()
    }

    pub fn db(&self) -> &Arc<sled::Db> {
        &self.db
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree
            .insert(key, value)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> StorageResult<bool> {
        self.tree
            .contains_key(key)
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree
            .flush()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}
