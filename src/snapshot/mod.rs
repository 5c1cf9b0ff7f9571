//! Snapshot Module
//!
//! Durable point-in-time copies of an in-memory map.
//!
//! ## Responsibilities
//! - Encode / decode the map with a checksummed header
//! - Write a new checkpoint atomically and retire older ones
//! - Find and load the latest checkpoint on startup
//! - Run checkpoints periodically on an owned, stoppable thread
//!
//! ## Directory Layout
//! ```text
//! {snapshot_dir}/
//!   ├── 1718000000123        (latest checkpoint, millis since epoch)
//!   └── 1718000030456.tmp    (only while a checkpoint is being written)
//! ```
//!
//! ## File Format
//! ```text
//! ┌──────────┬─────────────┬──────────┬──────────────┬──────────────────┐
//! │Magic (4) │ Version (2) │ CRC (4)  │ Payload Len  │ Payload (bincode)│
//! │  "KVSN"  │             │          │     (8)      │                  │
//! └──────────┴─────────────┴──────────┴──────────────┴──────────────────┘
//! ```

mod checkpointer;
mod format;
mod recovery;
mod writer;

pub use checkpointer::Checkpointer;
pub use format::{decode, encode, HEADER_SIZE, MAGIC, VERSION};
pub use recovery::{RecoveryResult, SnapshotRecovery};
pub use writer::SnapshotWriter;

/// Suffix of a checkpoint that has not been renamed into place yet
pub const TEMP_SUFFIX: &str = "tmp";

/// Parse a snapshot id from a file name
/// "1718000000123" → Some(1718000000123)
pub fn parse_snapshot_id(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
