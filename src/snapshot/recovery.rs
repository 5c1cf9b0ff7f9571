//! Snapshot Recovery
//!
//! Locates the latest checkpoint in a directory and loads it.

use std::fs;
use std::path::Path;

use crate::error::{Result, StashError};
use crate::store::StoreMap;

use super::{decode, parse_snapshot_id};

/// Handles loading state after a restart
pub struct SnapshotRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Id of the checkpoint that was loaded, if any
    pub snapshot_id: Option<u64>,

    /// Number of complete checkpoint files found in the directory
    pub snapshots_found: usize,

    /// Number of keys restored
    pub entries_recovered: usize,
}

impl SnapshotRecovery {
    /// All checkpoint ids in `dir`, ascending. Temp files and foreign files
    /// are ignored.
    pub fn list(dir: &Path) -> Result<Vec<u64>> {
        Ok(Self::list_files(dir)?.into_iter().map(|(id, _)| id).collect())
    }

    /// Checkpoint ids paired with the file name they were parsed from,
    /// ascending. Names like "00042" do not round-trip through the id.
    fn list_files(dir: &Path) -> Result<Vec<(u64, String)>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Some(id) = parse_snapshot_id(&name) {
                files.push((id, name));
            }
        }

        files.sort_unstable();
        Ok(files)
    }

    /// Id of the newest checkpoint in `dir`
    pub fn latest(dir: &Path) -> Result<Option<u64>> {
        Ok(Self::list(dir)?.last().copied())
    }

    /// Load the newest checkpoint in `dir`.
    ///
    /// An empty directory recovers to an empty map. A newest checkpoint that
    /// cannot be read or decoded is an error; older checkpoints are not tried.
    pub fn recover(dir: &Path) -> Result<(StoreMap, RecoveryResult)> {
        let files = Self::list_files(dir)?;

        let Some((id, name)) = files.last() else {
            return Ok((StoreMap::new(), RecoveryResult::default()));
        };
        let id = *id;

        let path = dir.join(name);
        let data = fs::read(&path)?;
        let map = decode(&data).map_err(|e| match e {
            StashError::SnapshotCorruption(msg) => {
                StashError::SnapshotCorruption(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        let result = RecoveryResult {
            snapshot_id: Some(id),
            snapshots_found: files.len(),
            entries_recovered: map.len(),
        };

        Ok((map, result))
    }
}
