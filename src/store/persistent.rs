//! Persistent store
//!
//! One file per key under a root directory, guarded by per-key locks.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StashError};

use super::{Entry, KvStore};

/// Mode for value files: readable and writable by everyone
#[cfg(unix)]
const FILE_MODE: u32 = 0o666;

/// Longest key accepted, in bytes (common file name limit)
pub const MAX_KEY_LEN: usize = 255;

type KeyLock = Arc<RwLock<()>>;

/// File-per-key backend
///
/// ## Layout
/// `{root}/{key}` holds the raw value bytes. Keys are used verbatim as file
/// names, so keys that could escape `root` are rejected (see `validate_key`).
///
/// ## Concurrency:
/// - Each key has its own RwLock, created lazily on first touch
///   - `put` / `delete`: exclusive on that key
///   - `get`: shared on that key
/// - `locks`: registry of per-key locks, itself behind an RwLock
///   - lookup under the read lock, get-or-insert under the write lock,
///     so at most one lock object exists per key
/// - `entries`: best-effort, locks every *registered* key (sorted order)
///   before listing. Keys whose lock is created concurrently are not covered.
pub struct PersistentStore {
    /// Directory holding one file per key
    root: PathBuf,

    /// Per-key lock registry
    locks: RwLock<HashMap<String, KeyLock>>,
}

impl PersistentStore {
    /// Open or create a store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        fs::create_dir_all(root).map_err(|e| {
            StashError::Config(format!(
                "cannot create store root {}: {}",
                root.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(StashError::Config(format!(
                "store root {} is not a directory",
                root.display()
            )));
        }

        tracing::debug!(root = %root.display(), "persistent store opened");

        Ok(Self {
            root: root.to_path_buf(),
            locks: RwLock::new(HashMap::new()),
        })
    }

    /// Get the root directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of keys that currently own a lock in the registry
    pub fn registered_locks(&self) -> usize {
        self.locks.read().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Reject keys that are not a single plain file name
    fn validate_key(key: &str) -> Result<()> {
        let escapes = key.is_empty()
            || key.len() > MAX_KEY_LEN
            || key == "."
            || key == ".."
            || key.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

        if escapes {
            return Err(StashError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Fetch the lock for `key`, creating it if this is the first touch
    fn lock_for(&self, key: &str) -> KeyLock {
        if let Some(lock) = self.locks.read().get(key) {
            return Arc::clone(lock);
        }

        // Re-checked under the write lock: a racing creator may have won
        let mut locks = self.locks.write();
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Drop `key` from the registry if the caller holds the only handle.
    ///
    /// Must be called while the caller still holds `lock`. Handles are only
    /// cloned under the registry lock, so the count cannot grow meanwhile.
    fn release_lock(&self, key: &str, lock: &KeyLock) {
        let mut locks = self.locks.write();
        let registered = locks.get(key).is_some_and(|l| Arc::ptr_eq(l, lock));
        if registered && Arc::strong_count(lock) == 2 {
            locks.remove(key);
        }
    }

    fn read_value(key: &str, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StashError::KeyNotFound,
            _ => StashError::key_io(key, e),
        })
    }

    fn write_value(path: &Path, value: &[u8]) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }

        let mut file = options.open(path)?;
        file.write_all(value)?;
        Ok(())
    }
}

impl KvStore for PersistentStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        let lock = self.lock_for(key);
        let _guard = lock.write();

        Self::write_value(&path, value).map_err(|e| {
            tracing::warn!(key, error = %e, "failed to write value file");
            // Failed writes must not grow the registry
            self.release_lock(key, &lock);
            StashError::key_io(key, e)
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.key_path(key)?;
        let lock = self.lock_for(key);
        let _guard = lock.read();

        let result = Self::read_value(key, &path);
        if result.is_err() {
            // A failed read should not leave a lock behind
            self.release_lock(key, &lock);
        }
        result
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let lock = self.lock_for(key);
        let _guard = lock.write();

        let result = match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to remove value file");
                Err(StashError::key_io(key, e))
            }
        };

        self.release_lock(key, &lock);
        result
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        let registered: Vec<(String, KeyLock)> = {
            let locks = self.locks.read();
            let mut registered: Vec<_> = locks
                .iter()
                .map(|(key, lock)| (key.clone(), Arc::clone(lock)))
                .collect();
            // One global acquisition order, so two enumerations cannot deadlock
            registered.sort_by(|a, b| a.0.cmp(&b.0));
            registered
        };
        let _guards: Vec<_> = registered.iter().map(|(_, lock)| lock.write()).collect();

        let mut entries = Vec::new();
        for item in fs::read_dir(&self.root)? {
            let item = item?;
            if !item.file_type()?.is_file() {
                continue;
            }

            let key = match item.file_name().into_string() {
                Ok(key) => key,
                Err(raw) => {
                    tracing::warn!(name = ?raw, "skipping non UTF-8 file name");
                    continue;
                }
            };

            match Self::read_value(&key, &item.path()) {
                Ok(value) => entries.push(Entry { key, value }),
                // Removed by an unlocked deleter after the listing
                Err(StashError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(entries)
    }
}
