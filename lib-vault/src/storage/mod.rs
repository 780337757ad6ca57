//! Vault persistence
//!
//! Each schema segment is stored under its own key, so an upgrade only adds
//! keys and the bytes of older segments are never rewritten by a swap:
//!
//! ```text
//! vault:logic        -> LogicModule
//! vault:segment:v1   -> StateV1
//! vault:segment:v2   -> StateV2   (V2+)
//! vault:segment:v3   -> StateV3   (V3+)
//! ```

pub mod errors;
pub mod memory;
pub mod sled_store;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sled_store::SledStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::schema::{SchemaVersion, StateV1, VaultState};
use crate::upgrade::LogicModule;
use crate::vault::Vault;

/// Byte-keyed backing store
pub trait StateStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn exists(&self, key: &[u8]) -> StorageResult<bool>;

    /// Make prior writes durable
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

pub const LOGIC_KEY: &[u8] = b"vault:logic";

/// Storage key of a version's segment
pub const fn segment_key(version: SchemaVersion) -> &'static [u8] {
    match version {
        SchemaVersion::V1 => b"vault:segment:v1",
        SchemaVersion::V2 => b"vault:segment:v2",
        SchemaVersion::V3 => b"vault:segment:v3",
    }
}

fn put<T: Serialize>(store: &dyn StateStore, key: &[u8], value: &T) -> StorageResult<()> {
    let bytes = bincode::serialize(value)?;
    store.set(key, &bytes)
}

fn fetch<T: DeserializeOwned>(store: &dyn StateStore, key: &[u8]) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

impl Vault {
    /// Write the logic descriptor and every present segment
    pub fn commit(&self, store: &dyn StateStore) -> StorageResult<()> {
        let state = self.state();
        put(store, LOGIC_KEY, self.logic())?;
        put(store, segment_key(SchemaVersion::V1), &state.v1)?;
        if let Some(v2) = &state.v2 {
            put(store, segment_key(SchemaVersion::V2), v2)?;
        }
        if let Some(v3) = &state.v3 {
            put(store, segment_key(SchemaVersion::V3), v3)?;
        }
        store.flush()?;

        tracing::info!(
            "Vault: committed {} state under logic {} ({} balances)",
            state.version(),
            self.logic().name,
            state.v1.balances.len()
        );
        Ok(())
    }

    /// Load a committed vault, `None` if nothing was ever committed
    ///
    /// # Errors
    /// `Corruption` if the segments do not match the recorded logic version
    pub fn restore(store: &dyn StateStore) -> StorageResult<Option<Vault>> {
        let Some(logic) = fetch::<LogicModule>(store, LOGIC_KEY)? else {
            return Ok(None);
        };
        let v1: StateV1 = fetch(store, segment_key(SchemaVersion::V1))?
            .ok_or_else(|| StorageError::Corruption("missing V1 segment".to_string()))?;

        let state = VaultState {
            v1,
            v2: fetch_segment(store, SchemaVersion::V2, logic.version)?,
            v3: fetch_segment(store, SchemaVersion::V3, logic.version)?,
        };
        state
            .check_segments()
            .map_err(|e| StorageError::Corruption(e.to_string()))?;

        tracing::info!(
            "Vault: restored {} state under logic {}",
            state.version(),
            logic.name
        );
        Ok(Some(Vault::from_parts(logic, state)))
    }
}

/// A segment must exist exactly when the logic version includes it
fn fetch_segment<T: DeserializeOwned>(
    store: &dyn StateStore,
    segment: SchemaVersion,
    logic: SchemaVersion,
) -> StorageResult<Option<T>> {
    let value = fetch(store, segment_key(segment))?;
    match (value.is_some(), segment <= logic) {
        (true, false) => Err(StorageError::Corruption(format!(
            "{} segment present under {} logic",
            segment, logic
        ))),
        (false, true) => Err(StorageError::Corruption(format!(
            "{} segment missing under {} logic",
            segment, logic
        ))),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::Address;

    #[test]
    fn test_restore_empty_store() {
        let store = MemoryStore::new();
        assert!(Vault::restore(&store).unwrap().is_none());
    }

    #[test]
    fn test_commit_restore_v1() {
        let store = MemoryStore::new();
        let mut vault = Vault::deploy(LogicModule::v1());
        vault.initialize(Address::new([0xa5; 32]), Address::new([1u8; 32]), 100).unwrap();
        vault.commit(&store).unwrap();

        assert!(store.exists(segment_key(SchemaVersion::V1)).unwrap());
        assert!(!store.exists(segment_key(SchemaVersion::V2)).unwrap());

        let restored = Vault::restore(&store).unwrap().unwrap();
        assert_eq!(restored.state(), vault.state());
        assert_eq!(restored.logic(), vault.logic());
        assert!(restored.events().is_empty());
    }

    #[test]
    fn test_segment_above_logic_is_corruption() {
        let store = MemoryStore::new();
        let vault = Vault::deploy(LogicModule::v1());
        vault.commit(&store).unwrap();
        put(&store, segment_key(SchemaVersion::V2), &crate::schema::StateV2::default()).unwrap();

        let err = Vault::restore(&store).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_missing_segment_is_corruption() {
        let store = MemoryStore::new();
        let vault = Vault::deploy(LogicModule::v2());
        vault.commit(&store).unwrap();
        put(&store, LOGIC_KEY, &LogicModule::v3()).unwrap();

        let err = Vault::restore(&store).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_garbage_bytes_are_serialization_error() {
        let store = MemoryStore::new();
        store.set(LOGIC_KEY, &[0xff]).unwrap();
        let err = Vault::restore(&store).unwrap_err();
        assert!(matches!(err, StorageError::SerializationError(_)));
    }
}
