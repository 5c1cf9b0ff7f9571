//! In-memory store
//!
//! HashMap wrapped in a single RwLock.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{Result, StashError};

use super::{Entry, KvStore};

/// Key/value map type shared with the snapshot codec
pub type StoreMap = HashMap<String, Vec<u8>>;

/// Coarse-locked in-memory backend
///
/// ## Concurrency:
/// - `get` / `entries`: shared lock, readers never block readers
/// - `put` / `delete`: exclusive lock
pub struct MemoryStore {
    map: RwLock<StoreMap>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_map(StoreMap::new())
    }

    /// Create a store seeded with `map` (used by snapshot recovery)
    pub fn from_map(map: StoreMap) -> Self {
        Self {
            map: RwLock::new(map),
        }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Take the writer lock. Checkpoints hold it while serializing so the
    /// snapshot is a point-in-time copy.
    pub(crate) fn lock_exclusive(&self) -> RwLockWriteGuard<'_, StoreMap> {
        self.map.write()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.map
            .read()
            .get(key)
            .cloned()
            .ok_or(StashError::KeyNotFound)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        let map = self.map.read();
        Ok(map
            .iter()
            .map(|(k, v)| Entry::new(k.clone(), v.clone()))
            .collect())
    }
}
