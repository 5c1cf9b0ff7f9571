//! Snapshot Writer
//!
//! Writes checkpoints and retires the ones they supersede.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::store::StoreMap;

use super::{encode, TEMP_SUFFIX};

/// Writes checkpoints into one directory
///
/// Callers serialize checkpoints (the snapshotted store holds the map's
/// writer lock around `checkpoint`), so only one is in flight at a time.
pub struct SnapshotWriter {
    /// Directory holding checkpoint files
    dir: PathBuf,

    /// Highest id handed out so far (ids are strictly increasing)
    last_id: AtomicU64,
}

impl SnapshotWriter {
    /// Create a writer for `dir`. `last_id` is the newest id already on disk.
    pub fn new(dir: impl Into<PathBuf>, last_id: u64) -> Self {
        Self {
            dir: dir.into(),
            last_id: AtomicU64::new(last_id),
        }
    }

    /// Get the snapshot directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `map` as a new checkpoint, then remove every other file in the
    /// directory. Returns the new checkpoint id.
    ///
    /// On failure the temp file is removed and existing checkpoints are left
    /// untouched.
    pub fn checkpoint(&self, map: &StoreMap) -> Result<u64> {
        let id = self.next_id();
        let final_path = self.dir.join(id.to_string());
        let temp_path = self.dir.join(format!("{}.{}", id, TEMP_SUFFIX));

        tracing::debug!(id, entries = map.len(), path = %final_path.display(), "writing checkpoint");

        if let Err(e) = Self::write_file(map, &temp_path, &final_path) {
            match fs::remove_file(&temp_path) {
                Ok(()) => {}
                Err(rm) if rm.kind() == io::ErrorKind::NotFound => {}
                Err(rm) => tracing::warn!(
                    path = %temp_path.display(),
                    error = %rm,
                    "failed to remove partial checkpoint"
                ),
            }
            return Err(e);
        }

        let retired = self.retire_all_except(id);
        tracing::info!(id, retired, "checkpoint saved");

        Ok(id)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_file(map: &StoreMap, temp_path: &Path, final_path: &Path) -> Result<()> {
        let bytes = encode(map)?;

        let mut file = File::create(temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(temp_path, final_path)?;
        Ok(())
    }

    /// Remove every file in the directory except checkpoint `keep`
    fn retire_all_except(&self, keep: u64) -> usize {
        let keep = keep.to_string();
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list snapshot directory");
                return 0;
            }
        };

        let mut retired = 0;
        for entry in listing.flatten() {
            if entry.file_name().to_str() == Some(keep.as_str()) {
                continue;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => retired += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "failed to retire old checkpoint"
                ),
            }
        }
        retired
    }

    /// Current time in millis, bumped past the last id if the clock has not
    /// moved (or went backwards)
    fn next_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);

        now.max(previous + 1)
    }
}
