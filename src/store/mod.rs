//! Store Module
//!
//! The operation contract every backend implements, and the backends.
//!
//! ## Backends
//! - [`MemoryStore`]: one `RwLock<HashMap>`, nothing on disk
//! - [`SnapshotStore`]: `MemoryStore` + periodic checkpoints + recovery
//! - [`PersistentStore`]: one file per key, per-key locks
//! - [`CachedStore`]: `PersistentStore` behind a write-through LRU cache
//!
//! Backends compose (cached wraps persistent, snapshotted wraps memory) but
//! never call each other laterally.

mod cached;
mod memory;
mod persistent;
mod snapshotted;

pub use cached::CachedStore;
pub use memory::{MemoryStore, StoreMap};
pub use persistent::{PersistentStore, MAX_KEY_LEN};
pub use snapshotted::SnapshotStore;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};

/// One key/value pair, as returned by [`KvStore::entries`]
///
/// Serializes as `{"Key": ..., "Value": ...}` with the value as a string.
/// Values that are not UTF-8 are converted lossily.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    pub key: String,
    #[serde(with = "value_text")]
    pub value: Vec<u8>,
}

mod value_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Whether an upsert created the key or replaced an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Updated,
}

/// Operation contract shared by all backends
///
/// All methods take `&self`; implementations synchronize internally and are
/// safe to share across threads behind an `Arc`.
pub trait KvStore: Send + Sync {
    /// Insert or overwrite `key`
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetch the value of `key`, or `StashError::KeyNotFound`
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Remove `key`. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Every current key/value pair, in no particular order
    fn entries(&self) -> Result<Vec<Entry>>;

    /// Existence probe built on `get`
    fn contains(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StashError::KeyNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Probe with `get`, then `put`, reporting which of the two happened.
    ///
    /// Not atomic: a concurrent writer may create the key between the probe
    /// and the put, in which case `Created` is still reported.
    fn upsert(&self, key: &str, value: &[u8]) -> Result<PutOutcome> {
        let existed = self.contains(key)?;
        self.put(key, value)?;
        Ok(if existed {
            PutOutcome::Updated
        } else {
            PutOutcome::Created
        })
    }
}
