//! Snapshotting store
//!
//! `MemoryStore` plus periodic checkpoints and recovery on open.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, StashError};
use crate::snapshot::{Checkpointer, RecoveryResult, SnapshotRecovery, SnapshotWriter};

use super::{Entry, KvStore, MemoryStore, StoreMap};

/// In-memory backend made durable by checkpoints
///
/// Reads and writes go straight to the wrapped `MemoryStore`. A background
/// `Checkpointer` takes the store's writer lock every `interval` and writes
/// the whole map to `{dir}/{millis}`, keeping only the newest checkpoint.
///
/// Checkpoint failures are logged and never surface through `KvStore`.
pub struct SnapshotStore {
    inner: Arc<MemoryStore>,
    writer: Arc<SnapshotWriter>,
    recovery: RecoveryResult,
    checkpointer: Checkpointer,
}

impl SnapshotStore {
    /// Open a store backed by checkpoints in `dir`
    ///
    /// On startup:
    /// 1. Create `dir` if it doesn't exist
    /// 2. Load the newest checkpoint (failures are logged, store starts empty)
    /// 3. Start the checkpoint thread
    pub fn open(dir: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let dir = dir.as_ref();

        if interval.is_zero() {
            return Err(StashError::Config(
                "snapshot interval must be greater than zero".to_string(),
            ));
        }

        fs::create_dir_all(dir).map_err(|e| {
            StashError::Config(format!(
                "cannot create snapshot directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let (map, recovery) = match SnapshotRecovery::recover(dir) {
            Ok((map, recovery)) => {
                if let Some(id) = recovery.snapshot_id {
                    tracing::info!(
                        snapshot_id = id,
                        snapshots_found = recovery.snapshots_found,
                        entries_recovered = recovery.entries_recovered,
                        "recovered from checkpoint"
                    );
                }
                (map, recovery)
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "checkpoint recovery failed, starting empty");
                (StoreMap::new(), RecoveryResult::default())
            }
        };

        let inner = Arc::new(MemoryStore::from_map(map));
        let writer = Arc::new(SnapshotWriter::new(
            dir,
            recovery.snapshot_id.unwrap_or(0),
        ));

        let checkpointer = {
            let inner = Arc::clone(&inner);
            let writer = Arc::clone(&writer);
            Checkpointer::spawn(interval, move || {
                if let Err(e) = checkpoint_with(&inner, &writer) {
                    tracing::warn!(error = %e, "periodic checkpoint failed");
                }
            })?
        };

        Ok(Self {
            inner,
            writer,
            recovery,
            checkpointer,
        })
    }

    /// Take a checkpoint now. Returns its id.
    pub fn checkpoint(&self) -> Result<u64> {
        checkpoint_with(&self.inner, &self.writer)
    }

    /// Stop the checkpoint thread and take a final checkpoint
    pub fn close(mut self) -> Result<u64> {
        self.checkpointer.stop();
        self.checkpoint()
    }

    /// What was loaded on open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the snapshot directory path
    pub fn snapshot_dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Number of keys in memory
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Checkpoint under the map's writer lock so the copy is point-in-time
fn checkpoint_with(store: &MemoryStore, writer: &SnapshotWriter) -> Result<u64> {
    let map = store.lock_exclusive();
    writer.checkpoint(&map)
}

impl KvStore for SnapshotStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        self.inner.entries()
    }
}
