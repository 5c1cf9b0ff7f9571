//! Tests for PersistentStore
//!
//! These tests verify:
//! - Opening/creating the root directory
//! - One file per key with raw value bytes
//! - Idempotent delete and lock registry reclaim
//! - Key validation (no escaping the root)
//! - Persistence across reopen
//! - Concurrent access patterns

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::thread;

use kvstash::store::{KvStore, PersistentStore, MAX_KEY_LEN};
use kvstash::StashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PersistentStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = PersistentStore::open(temp_dir.path().join("store")).unwrap();
    (temp_dir, store)
}

fn entries_map(store: &PersistentStore) -> HashMap<String, Vec<u8>> {
    store
        .entries()
        .unwrap()
        .into_iter()
        .map(|e| (e.key, e.value))
        .collect()
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("store");

    assert!(!path.exists());

    let store = PersistentStore::open(&path).unwrap();

    assert!(path.is_dir());
    assert_eq!(store.root(), path.as_path());
}

#[test]
fn test_open_on_file_fails_with_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("not_a_dir");
    fs::write(&path, b"x").unwrap();

    let result = PersistentStore::open(&path);

    assert!(matches!(result, Err(StashError::Config(_))));
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_writes_raw_file() {
    let (_temp, store) = setup_temp_store();

    store.put("hello", b"world").unwrap();

    let on_disk = fs::read(store.root().join("hello")).unwrap();
    assert_eq!(on_disk, b"world".to_vec());
}

#[test]
fn test_put_get() {
    let (_temp, store) = setup_temp_store();

    store.put("hello", b"world").unwrap();

    assert_eq!(store.get("hello").unwrap(), b"world".to_vec());
}

#[test]
fn test_get_nonexistent_key() {
    let (_temp, store) = setup_temp_store();

    assert!(matches!(store.get("missing"), Err(StashError::KeyNotFound)));
}

#[test]
fn test_put_overwrite_shorter_value() {
    let (_temp, store) = setup_temp_store();

    store.put("key", b"a much longer value").unwrap();
    store.put("key", b"short").unwrap();

    assert_eq!(store.get("key").unwrap(), b"short".to_vec());
    assert_eq!(store.entries().unwrap().len(), 1);
}

#[test]
fn test_empty_value() {
    let (_temp, store) = setup_temp_store();

    store.put("key", b"").unwrap();

    assert_eq!(store.get("key").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_delete_is_idempotent() {
    let (_temp, store) = setup_temp_store();

    store.put("key", b"value").unwrap();

    store.delete("key").unwrap();
    assert!(matches!(store.get("key"), Err(StashError::KeyNotFound)));
    assert!(!store.root().join("key").exists());

    store.delete("key").unwrap();
    assert!(matches!(store.get("key"), Err(StashError::KeyNotFound)));
}

#[test]
fn test_delete_nonexistent_key() {
    let (_temp, store) = setup_temp_store();
    store.delete("never_written").unwrap();
}

#[test]
fn test_entries() {
    let (_temp, store) = setup_temp_store();

    store.put("key1", b"value1").unwrap();
    store.put("key2", b"value2").unwrap();
    store.delete("key1").unwrap();
    store.put("key3", b"value3").unwrap();

    let entries = entries_map(&store);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["key2"], b"value2".to_vec());
    assert_eq!(entries["key3"], b"value3".to_vec());
}

#[test]
fn test_entries_skips_subdirectories() {
    let (_temp, store) = setup_temp_store();

    store.put("key", b"value").unwrap();
    fs::create_dir(store.root().join("subdir")).unwrap();

    let entries = entries_map(&store);
    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key("key"));
}

// =============================================================================
// Lock Registry Tests
// =============================================================================

#[test]
fn test_delete_reclaims_lock() {
    let (_temp, store) = setup_temp_store();

    store.put("a", b"1").unwrap();
    store.put("b", b"2").unwrap();
    assert_eq!(store.registered_locks(), 2);

    store.delete("a").unwrap();
    assert_eq!(store.registered_locks(), 1);
}

#[test]
fn test_get_miss_does_not_leak_lock() {
    let (_temp, store) = setup_temp_store();

    for i in 0..100 {
        let _ = store.get(&format!("missing{}", i));
    }

    assert_eq!(store.registered_locks(), 0);
}

#[test]
fn test_overlong_keys_rejected_without_leaking_locks() {
    let (_temp, store) = setup_temp_store();

    for i in 0..100 {
        let key = format!("{:0>300}", i);
        assert!(matches!(store.get(&key), Err(StashError::InvalidKey(_))));
        assert!(matches!(store.put(&key, b"v"), Err(StashError::InvalidKey(_))));
    }

    assert_eq!(store.registered_locks(), 0);
    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn test_longest_allowed_key_round_trips() {
    let (_temp, store) = setup_temp_store();
    let key = "k".repeat(MAX_KEY_LEN);

    assert!(matches!(store.get(&key), Err(StashError::KeyNotFound)));
    store.put(&key, b"v").unwrap();

    assert_eq!(store.get(&key).unwrap(), b"v".to_vec());
}

#[test]
fn test_failed_put_and_get_release_lock() {
    let (_temp, store) = setup_temp_store();

    // A directory where the value file should be makes both calls fail
    fs::create_dir(store.root().join("blocked")).unwrap();

    assert!(matches!(store.put("blocked", b"v"), Err(StashError::KeyIo { .. })));
    assert!(matches!(store.get("blocked"), Err(StashError::KeyIo { .. })));

    assert_eq!(store.registered_locks(), 0);
}

// =============================================================================
// Key Validation Tests
// =============================================================================

#[test]
fn test_rejects_keys_that_escape_root() {
    let (_temp, store) = setup_temp_store();

    for key in ["", ".", "..", "../escape", "a/b", "a\\b", "nul\0byte"] {
        assert!(
            matches!(store.put(key, b"x"), Err(StashError::InvalidKey(_))),
            "put accepted {:?}",
            key
        );
        assert!(matches!(store.get(key), Err(StashError::InvalidKey(_))));
        assert!(matches!(store.delete(key), Err(StashError::InvalidKey(_))));
    }

    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn test_accepts_dotted_names() {
    let (_temp, store) = setup_temp_store();

    store.put("...", b"dots").unwrap();
    store.put(".hidden", b"h").unwrap();

    assert_eq!(store.get("...").unwrap(), b"dots".to_vec());
    assert_eq!(store.get(".hidden").unwrap(), b"h".to_vec());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_sees_previous_data() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store");

    {
        let store = PersistentStore::open(&path).unwrap();
        store.put("k1", b"v1").unwrap();
        store.put("k2", b"v2").unwrap();
    }

    let store = PersistentStore::open(&path).unwrap();
    assert_eq!(store.get("k1").unwrap(), b"v1".to_vec());
    assert_eq!(store.get("k2").unwrap(), b"v2".to_vec());
    assert_eq!(store.entries().unwrap().len(), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writes_distinct_keys() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);
    let mut handles = vec![];

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{}", t, i);
                let value = format!("thread{}_value{}", t, i);
                store.put(&key, value.as_bytes()).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = entries_map(&store);
    assert_eq!(entries.len(), 8 * 25);
    for t in 0..8 {
        for i in 0..25 {
            let key = format!("thread{}_key{}", t, i);
            let expected = format!("thread{}_value{}", t, i);
            assert_eq!(entries[&key], expected.into_bytes());
        }
    }
}

#[test]
fn test_concurrent_writes_same_key_never_interleave() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);
    let mut handles = vec![];

    for t in 0..8u8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let value = vec![b'a' + t; 64 * 1024];
            for _ in 0..20 {
                store.put("shared", &value).unwrap();
                let read = store.get("shared").unwrap();
                assert_eq!(read.len(), 64 * 1024);
                assert!(read.iter().all(|&b| b == read[0]), "torn value observed");
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_entries_concurrent_with_writers() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);
    for i in 0..20 {
        store.put(&format!("seed{}", i), b"seed").unwrap();
    }

    let mut handles = vec![];
    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{}", t, i);
                store.put(&key, b"v").unwrap();
                store.delete(&key).unwrap();
            }
        }));
    }

    for _ in 0..2 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                let entries = store.entries().unwrap();
                assert!(entries.len() >= 20);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.entries().unwrap().len(), 20);
}
