//! Engine Module
//!
//! Opens the backend selected by `Config` and exposes it through `KvStore`.
//!
//! ## Responsibilities
//! - Validate configuration and pick exactly one backend
//! - Dispatch the operation contract to that backend
//! - Shut the backend down cleanly (final checkpoint for snapshotted mode)

use std::path::Path;

use crate::cache::LruCache;
use crate::config::{Config, StoreMode};
use crate::error::Result;
use crate::store::{CachedStore, Entry, KvStore, MemoryStore, PersistentStore, SnapshotStore};

/// The backend variants, chosen once at open and never switched
pub enum Backend {
    InMemory(MemoryStore),
    InMemorySnapshotted(SnapshotStore),
    Persistent(PersistentStore),
    PersistentCached(CachedStore<LruCache>),
}

impl Backend {
    fn as_store(&self) -> &dyn KvStore {
        match self {
            Backend::InMemory(store) => store,
            Backend::InMemorySnapshotted(store) => store,
            Backend::Persistent(store) => store,
            Backend::PersistentCached(store) => store,
        }
    }
}

/// The storage engine handed to the outer layers
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The selected backend
    backend: Backend,
}

impl Engine {
    /// Open the backend described by `config`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let backend = match config.mode {
            StoreMode::InMemory => Backend::InMemory(MemoryStore::new()),
            StoreMode::InMemorySnapshotted => Backend::InMemorySnapshotted(SnapshotStore::open(
                &config.data_dir,
                config.snapshot_interval,
            )?),
            StoreMode::Persistent => Backend::Persistent(PersistentStore::open(&config.data_dir)?),
            StoreMode::PersistentCached => Backend::PersistentCached(CachedStore::open(
                &config.data_dir,
                config.cache_capacity,
            )?),
        };

        tracing::info!(mode = %config.mode, data_dir = %config.data_dir.display(), "engine opened");

        Ok(Self { config, backend })
    }

    /// Open an in-memory engine (no files touched)
    pub fn in_memory() -> Result<Self> {
        Self::open(Config::default())
    }

    /// Open a file-backed engine rooted at `path`
    pub fn open_path(mode: StoreMode, path: &Path) -> Result<Self> {
        let config = Config::builder().mode(mode).data_dir(path).build();
        Self::open(config)
    }

    /// Close the engine gracefully
    ///
    /// Stops the checkpoint thread and writes a final checkpoint when the
    /// backend is snapshotted. Other backends have nothing to flush.
    pub fn close(self) -> Result<()> {
        if let Backend::InMemorySnapshotted(store) = self.backend {
            let id = store.close()?;
            tracing::info!(snapshot_id = id, "final checkpoint written");
        }
        tracing::info!("engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The mode this engine was opened with
    pub fn mode(&self) -> StoreMode {
        self.config.mode
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct access to the backend variant
    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

impl KvStore for Engine {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.backend.as_store().put(key, value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.backend.as_store().get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.backend.as_store().delete(key)
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        self.backend.as_store().entries()
    }
}
