//! Configuration for KvStash
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, StashError};

/// Main configuration for a KvStash instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Backend Selection
    // -------------------------------------------------------------------------
    /// Which backend to open. Fixed for the lifetime of the engine.
    pub mode: StoreMode,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for on-disk state.
    ///   persistent modes:   {data_dir}/{key}   (one file per key)
    ///   snapshotted mode:   {data_dir}/{millis} (latest checkpoint only)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Time between two checkpoints of the in-memory map
    pub snapshot_interval: Duration,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max number of entries held by the LRU cache (persistent-cached only)
    pub cache_capacity: usize,
}

/// Backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Coarse-locked map, nothing on disk
    InMemory,

    /// In-memory map with periodic checkpoints and recovery on open
    InMemorySnapshotted,

    /// One file per key with per-key locking
    Persistent,

    /// Persistent store fronted by a write-through LRU cache
    PersistentCached,
}

impl StoreMode {
    pub const ALL: [StoreMode; 4] = [
        StoreMode::InMemory,
        StoreMode::InMemorySnapshotted,
        StoreMode::Persistent,
        StoreMode::PersistentCached,
    ];

    /// Name accepted by `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::InMemory => "in-memory",
            StoreMode::InMemorySnapshotted => "in-memory-snapshotted",
            StoreMode::Persistent => "persistent",
            StoreMode::PersistentCached => "persistent-cached",
        }
    }

    /// Whether this mode keeps state under `data_dir`
    pub fn uses_data_dir(&self) -> bool {
        !matches!(self, StoreMode::InMemory)
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreMode {
    type Err = StashError;

    fn from_str(s: &str) -> Result<Self> {
        StoreMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                StashError::Config(format!(
                    "unknown store mode {:?} (expected one of: in-memory, \
                     in-memory-snapshotted, persistent, persistent-cached)",
                    s
                ))
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: StoreMode::InMemory,
            data_dir: PathBuf::from("./kvstash_data"),
            snapshot_interval: Duration::from_secs(30),
            cache_capacity: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no backend can run with
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(StashError::Config(
                "cache capacity must be at least 1".to_string(),
            ));
        }

        if self.mode == StoreMode::InMemorySnapshotted && self.snapshot_interval.is_zero() {
            return Err(StashError::Config(
                "snapshot interval must be greater than zero".to_string(),
            ));
        }

        if self.mode.uses_data_dir() && self.data_dir.as_os_str().is_empty() {
            return Err(StashError::Config(format!(
                "mode {} requires a data directory",
                self.mode
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backend mode
    pub fn mode(mut self, mode: StoreMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the checkpoint interval
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.config.snapshot_interval = interval;
        self
    }

    /// Set the checkpoint interval (in seconds)
    pub fn snapshot_interval_secs(mut self, secs: u64) -> Self {
        self.config.snapshot_interval = Duration::from_secs(secs);
        self
    }

    /// Set the LRU cache capacity (in entries)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
