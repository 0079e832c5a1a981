//! On-disk record format of the embedded engine.
//!
//! ```text
//! | record_len (4) | flags (1) | key_len (4) | key (K) | value (V) | crc32 (4) |
//! ```
//!
//! `record_len` covers the whole record including itself and the CRC. The
//! CRC covers every byte before it.

use super::error::{EngineError, EngineResult};

/// Length prefix, flags and key length.
pub(crate) const HEADER_SIZE: usize = 9;
pub(crate) const CRC_SIZE: usize = 4;

const FLAG_TOMBSTONE: u8 = 0x01;

/// A put or a tombstone for one raw key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub(crate) key: Vec<u8>,
    /// `None` marks a deletion.
    pub(crate) value: Option<Vec<u8>>,
}

impl Record {
    pub(crate) fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub(crate) fn tombstone(key: Vec<u8>) -> Self {
        Self { key, value: None }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.as_ref().map_or(0, Vec::len) + CRC_SIZE
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.extend_from_slice(&(self.encoded_len() as u32).to_le_bytes());
        buf.push(if self.value.is_none() { FLAG_TOMBSTONE } else { 0 });
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        if let Some(value) = &self.value {
            buf.extend_from_slice(value);
        }
        let crc = crc32fast::hash(&buf[start..]);
        buf.extend_from_slice(&crc.to_le_bytes());
    }

    /// Decodes one complete record read from `offset`.
    pub(crate) fn decode(data: &[u8], offset: u64) -> EngineResult<Self> {
        if data.len() < HEADER_SIZE + CRC_SIZE {
            return Err(EngineError::corrupted(offset, "record shorter than header"));
        }

        let record_len = read_u32(&data[0..4]) as usize;
        if record_len != data.len() {
            return Err(EngineError::corrupted(
                offset,
                format!("length prefix {record_len} but {} bytes read", data.len()),
            ));
        }

        let body = &data[..record_len - CRC_SIZE];
        let stored_crc = read_u32(&data[record_len - CRC_SIZE..]);
        let actual_crc = crc32fast::hash(body);
        if stored_crc != actual_crc {
            return Err(EngineError::corrupted(
                offset,
                format!("checksum mismatch: expected {stored_crc:08x}, got {actual_crc:08x}"),
            ));
        }

        let flags = data[4];
        let key_len = read_u32(&data[5..9]) as usize;
        let key_end = HEADER_SIZE + key_len;
        if key_end > body.len() {
            return Err(EngineError::corrupted(offset, "key extends past record"));
        }

        let key = body[HEADER_SIZE..key_end].to_vec();
        if flags & FLAG_TOMBSTONE != 0 {
            Ok(Self::tombstone(key))
        } else {
            Ok(Self::put(key, body[key_end..].to_vec()))
        }
    }
}

/// Reads the little-endian length prefix at the start of a record.
pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
