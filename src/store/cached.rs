//! Cached persistent store
//!
//! `PersistentStore` fronted by a write-through, read-populate cache.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::cache::{Cache, LruCache};
use crate::error::Result;

use super::{Entry, KvStore, PersistentStore};

/// Persistent backend with a bounded in-process cache
///
/// ## Policy
/// - `put`: write the file first, cache only on success
/// - `get`: cache hit returns directly; a miss reads the file and populates
/// - `delete`: evict from cache (unconditionally), then remove the file
/// - `entries`: persistent store only; the cache is a subset of it
///
/// ## Concurrency:
/// - `lock`: one outer RwLock on top of the store's per-key locks
///   - `put` / `delete`: exclusive
///   - `get`: shared for lookup + file read, exclusive to populate
/// - `generation`: bumped by every `put` / `delete` under the exclusive lock.
///   A miss only populates the cache if no write happened between its read
///   and the populate, so it can never reinstall a deleted or stale value.
pub struct CachedStore<C: Cache = LruCache> {
    store: PersistentStore,
    cache: C,
    lock: RwLock<()>,
    generation: AtomicU64,
}

impl CachedStore<LruCache> {
    /// Open a persistent store at `root` with an LRU cache of `capacity` entries
    pub fn open(root: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let store = PersistentStore::open(root)?;
        let cache = LruCache::new(capacity)?;
        Ok(Self::with_cache(store, cache))
    }
}

impl<C: Cache> CachedStore<C> {
    /// Combine an existing store with any cache policy
    pub fn with_cache(store: PersistentStore, cache: C) -> Self {
        Self {
            store,
            cache,
            lock: RwLock::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The backing persistent store
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// The cache in front of it
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<C: Cache> KvStore for CachedStore<C> {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.write();
        self.generation.fetch_add(1, Ordering::Relaxed);

        self.store.put(key, value)?;
        self.cache.write(key, value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let (value, seen) = {
            let _guard = self.lock.read();
            if let Some(value) = self.cache.read(key) {
                return Ok(value);
            }
            let seen = self.generation.load(Ordering::Relaxed);
            (self.store.get(key)?, seen)
        };

        let _guard = self.lock.write();
        if self.generation.load(Ordering::Relaxed) == seen {
            self.cache.write(key, value.clone());
        } else {
            tracing::trace!(key, "skipping cache populate after concurrent write");
        }
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.write();
        self.generation.fetch_add(1, Ordering::Relaxed);

        self.cache.delete(key);
        self.store.delete(key)
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        self.store.entries()
    }
}
