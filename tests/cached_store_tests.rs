//! Tests for CachedStore
//!
//! These tests verify:
//! - Write-through: put reaches disk and the cache
//! - Read-populate on miss
//! - Delete evicts from cache and disk
//! - Failed persistent writes leave the cache untouched
//! - Entries come from the persistent store
//! - Concurrent access patterns

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use kvstash::cache::Cache;
use kvstash::store::{CachedStore, KvStore};
use kvstash::StashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(capacity: usize) -> (TempDir, CachedStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = CachedStore::open(temp_dir.path().join("store"), capacity).unwrap();
    (temp_dir, store)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_rejects_zero_capacity() {
    let temp_dir = TempDir::new().unwrap();

    let result = CachedStore::open(temp_dir.path(), 0);

    assert!(matches!(result, Err(StashError::Config(_))));
}

#[test]
fn test_put_writes_through() {
    let (_temp, store) = setup_temp_store(4);

    store.put("k", b"v").unwrap();

    assert_eq!(fs::read(store.store().root().join("k")).unwrap(), b"v".to_vec());
    assert_eq!(store.cache().read("k"), Some(b"v".to_vec()));
    assert_eq!(store.get("k").unwrap(), b"v".to_vec());
}

#[test]
fn test_get_nonexistent_key() {
    let (_temp, store) = setup_temp_store(4);

    assert!(matches!(store.get("missing"), Err(StashError::KeyNotFound)));
    assert!(store.cache().is_empty());
}

#[test]
fn test_get_miss_populates_cache() {
    let (_temp, store) = setup_temp_store(4);

    // Written behind the cache's back
    store.store().put("k", b"from-disk").unwrap();
    assert_eq!(store.cache().read("k"), None);

    assert_eq!(store.get("k").unwrap(), b"from-disk".to_vec());
    assert_eq!(store.cache().read("k"), Some(b"from-disk".to_vec()));
}

#[test]
fn test_hit_served_from_cache() {
    let (_temp, store) = setup_temp_store(4);

    store.put("k", b"cached").unwrap();
    // Only visible to a reader that skips the cache
    fs::write(store.store().root().join("k"), b"changed-on-disk").unwrap();

    assert_eq!(store.get("k").unwrap(), b"cached".to_vec());
}

#[test]
fn test_put_delete_get_not_found() {
    let (_temp, store) = setup_temp_store(4);

    store.put("k", b"v").unwrap();
    store.delete("k").unwrap();

    assert!(matches!(store.get("k"), Err(StashError::KeyNotFound)));
    assert_eq!(store.cache().read("k"), None);
    assert!(!store.store().root().join("k").exists());
}

#[test]
fn test_delete_is_idempotent() {
    let (_temp, store) = setup_temp_store(4);

    store.put("k", b"v").unwrap();
    store.delete("k").unwrap();
    store.delete("k").unwrap();

    assert!(matches!(store.get("k"), Err(StashError::KeyNotFound)));
}

#[test]
fn test_failed_put_leaves_cache_untouched() {
    let (_temp, store) = setup_temp_store(4);

    let result = store.put("../escape", b"v");

    assert!(matches!(result, Err(StashError::InvalidKey(_))));
    assert!(store.cache().is_empty());
}

#[test]
fn test_failed_put_keeps_previous_cached_value() {
    let (_temp, store) = setup_temp_store(4);

    store.put("k", b"old").unwrap();
    // A directory where the value file should be makes the write fail
    fs::remove_file(store.store().root().join("k")).unwrap();
    fs::create_dir(store.store().root().join("k")).unwrap();

    let result = store.put("k", b"new");

    assert!(matches!(result, Err(StashError::KeyIo { .. })));
    assert_eq!(store.cache().read("k"), Some(b"old".to_vec()));
}

#[test]
fn test_eviction_falls_back_to_disk() {
    let (_temp, store) = setup_temp_store(2);

    store.put("a", b"1").unwrap();
    store.put("b", b"2").unwrap();
    store.put("c", b"3").unwrap();

    assert_eq!(store.cache().read("a"), None);
    assert_eq!(store.cache().len(), 2);
    assert_eq!(store.get("a").unwrap(), b"1".to_vec());
}

#[test]
fn test_entries_reads_persistent_store() {
    let (_temp, store) = setup_temp_store(1);

    store.put("a", b"1").unwrap();
    store.put("b", b"2").unwrap();
    store.put("c", b"3").unwrap();

    let keys: HashSet<String> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
    let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(keys, expected);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writes_distinct_keys() {
    let (_temp, store) = setup_temp_store(8);
    let store = Arc::new(store);
    let mut handles = vec![];

    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{}", t, i);
                store.put(&key, key.as_bytes()).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 100);
    for entry in entries {
        assert_eq!(entry.value, entry.key.as_bytes());
    }
    assert_eq!(store.cache().len(), 8);
}

#[test]
fn test_concurrent_get_and_delete_never_resurrects() {
    let (_temp, store) = setup_temp_store(16);
    let store = Arc::new(store);

    for round in 0..50 {
        let key = format!("key{}", round);
        store.put(&key, b"v").unwrap();
        // Push the key out of the cache so readers take the miss path
        store.cache().delete(&key);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    let _ = store.get(&key);
                })
            })
            .collect();

        store.delete(&key).unwrap();

        for reader in readers {
            reader.join().unwrap();
        }

        assert!(matches!(store.get(&key), Err(StashError::KeyNotFound)));
        assert_eq!(store.cache().read(&key), None);
    }
}
