//! # KvStash
//!
//! A pluggable key-value storage engine with interchangeable backends:
//! - Pure in-memory map behind one RwLock
//! - In-memory map with periodic checkpoints and crash recovery
//! - File-per-key persistent storage with per-key locking
//! - Persistent storage fronted by a bounded write-through LRU cache
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Outer layer (HTTP / CLI)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  KvStore: put / get / delete / entries
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │              (backend chosen once from Config)               │
//! └──────┬──────────────┬────────────────┬───────────────┬──────┘
//!        │              │                │               │
//!        ▼              ▼                ▼               ▼
//! ┌────────────┐ ┌──────────────┐ ┌─────────────┐ ┌──────────────┐
//! │ MemoryStore│ │SnapshotStore │ │ Persistent  │ │ CachedStore  │
//! │  (RwLock)  │ │ Memory +     │ │   Store     │ │ LRU cache +  │
//! │            │ │ Checkpointer │ │ (per-key    │ │ Persistent   │
//! │            │ │              │ │  RwLocks)   │ │ Store        │
//! └────────────┘ └──────────────┘ └─────────────┘ └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod cache;
pub mod store;
pub mod snapshot;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StashError, Result};
pub use config::{Config, StoreMode};
pub use engine::Engine;
pub use store::{Entry, KvStore, PutOutcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of KvStash
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
