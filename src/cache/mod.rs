//! Cache Module
//!
//! Bounded in-process caches used in front of slower backends.
//!
//! ## Responsibilities
//! - Fixed capacity, evict when full
//! - O(1) read / write / delete
//! - Internal shared-exclusive locking (all methods take `&self`)
//!
//! A cache knows nothing about the store behind it. Keeping it coherent with
//! persisted data is the caller's job (see `store::CachedStore`).

mod lru;

pub use lru::LruCache;

/// Policy interface for a key/value cache
pub trait Cache: Send + Sync {
    /// Look up a key. `None` is a miss.
    fn read(&self, key: &str) -> Option<Vec<u8>>;

    /// Insert or overwrite a key, evicting as needed to stay within capacity
    fn write(&self, key: &str, value: Vec<u8>);

    /// Remove a key if present
    fn delete(&self, key: &str);
}
