//! Snapshot file encoding
//!
//! Header framing with `bytes`, payload with bincode, integrity via CRC32.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StashError};
use crate::store::StoreMap;

/// File magic
pub const MAGIC: &[u8; 4] = b"KVSN";

/// Current format version
pub const VERSION: u16 = 1;

/// Magic (4) + Version (2) + CRC (4) + Payload Len (8)
pub const HEADER_SIZE: usize = 4 + 2 + 4 + 8;

/// Encode a full map into snapshot bytes
pub fn encode(map: &StoreMap) -> Result<Bytes> {
    let payload = bincode::serialize(map)?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(MAGIC);
    buf.put_u16(VERSION);
    buf.put_u32(crc32fast::hash(&payload));
    buf.put_u64(payload.len() as u64);
    buf.put_slice(&payload);

    Ok(buf.freeze())
}

/// Decode snapshot bytes, verifying header and checksum
pub fn decode(data: &[u8]) -> Result<StoreMap> {
    if data.len() < HEADER_SIZE {
        return Err(StashError::SnapshotCorruption(format!(
            "file too short: {} bytes, header needs {}",
            data.len(),
            HEADER_SIZE
        )));
    }

    let mut header = &data[..HEADER_SIZE];

    let mut magic = [0u8; 4];
    header.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(StashError::SnapshotCorruption(format!(
            "bad magic {:?}",
            magic
        )));
    }

    let version = header.get_u16();
    if version != VERSION {
        return Err(StashError::SnapshotCorruption(format!(
            "unsupported version {}",
            version
        )));
    }

    let expected_crc = header.get_u32();
    let payload_len = header.get_u64();

    let payload = &data[HEADER_SIZE..];
    if payload.len() as u64 != payload_len {
        return Err(StashError::SnapshotCorruption(format!(
            "payload length mismatch: header says {}, found {}",
            payload_len,
            payload.len()
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(StashError::SnapshotCorruption(format!(
            "checksum mismatch: expected {:#010x}, got {:#010x}",
            expected_crc, actual_crc
        )));
    }

    Ok(bincode::deserialize(payload)?)
}
