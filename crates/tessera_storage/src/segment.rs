//! Segments and key-segment pairs.
//!
//! A segment's buffer is produced by the codec layer and is opaque here.
//! Backends persist a segment as a small fixed header followed by the
//! buffer verbatim:
//!
//! ```text
//! | magic (4) | encoding_version (2) | start_ts (8) | end_ts (8) | buffer_len (8) | buffer (N) |
//! ```

use crate::error::{StorageError, StorageResult};
use crate::key::AtomKey;

const MAGIC: [u8; 4] = *b"TSG1";
const HEADER_LEN: usize = 30;

/// Metadata stored alongside a segment's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentHeader {
    /// Start of the time range covered by the segment.
    pub start_ts: i64,
    /// End of the time range covered by the segment.
    pub end_ts: i64,
    /// Version of the codec that produced the buffer.
    pub encoding_version: u16,
}

/// A header plus an exclusively owned, opaque byte payload.
///
/// An empty buffer is valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    header: SegmentHeader,
    buffer: Vec<u8>,
}

impl Segment {
    /// Creates an empty segment with a default header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a segment owning `buffer`.
    #[must_use]
    pub fn with_buffer(buffer: Vec<u8>) -> Self {
        Self {
            header: SegmentHeader::default(),
            buffer,
        }
    }

    /// Returns the header.
    #[must_use]
    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// Returns the header for modification.
    pub fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    /// Returns the buffer.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Replaces the buffer, returning the previous one.
    pub fn set_buffer(&mut self, buffer: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.buffer, buffer)
    }

    /// Consumes the segment, returning its buffer.
    #[must_use]
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Total size of the persisted image in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.buffer.len()
    }

    /// Frames the segment for persistence.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.header.encoding_version.to_le_bytes());
        out.extend_from_slice(&self.header.start_ts.to_le_bytes());
        out.extend_from_slice(&self.header.end_ts.to_le_bytes());
        out.extend_from_slice(&(self.buffer.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.buffer);
        out
    }

    /// Parses a persisted image produced by [`Segment::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the image is truncated, has a
    /// bad magic, or its buffer length disagrees with the image size.
    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(StorageError::corrupted(format!(
                "segment image too short: {} bytes",
                data.len()
            )));
        }
        if data[0..4] != MAGIC {
            return Err(StorageError::corrupted("bad segment magic"));
        }

        let encoding_version = u16::from_le_bytes([data[4], data[5]]);
        let start_ts = i64::from_le_bytes(read8(&data[6..14]));
        let end_ts = i64::from_le_bytes(read8(&data[14..22]));
        let buffer_len = u64::from_le_bytes(read8(&data[22..30]));

        let buffer = &data[HEADER_LEN..];
        if buffer.len() as u64 != buffer_len {
            return Err(StorageError::corrupted(format!(
                "segment buffer length {buffer_len} does not match {} stored bytes",
                buffer.len()
            )));
        }

        Ok(Self {
            header: SegmentHeader {
                start_ts,
                end_ts,
                encoding_version,
            },
            buffer: buffer.to_vec(),
        })
    }
}

fn read8(slice: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(slice);
    out
}

/// One key and the segment stored under it.
///
/// `write` and `update` take the pair by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySegmentPair {
    key: AtomKey,
    segment: Segment,
}

impl KeySegmentPair {
    /// Pairs `key` with an empty segment.
    #[must_use]
    pub fn new(key: AtomKey) -> Self {
        Self {
            key,
            segment: Segment::new(),
        }
    }

    /// Pairs `key` with `segment`.
    #[must_use]
    pub fn with_segment(key: AtomKey, segment: Segment) -> Self {
        Self { key, segment }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &AtomKey {
        &self.key
    }

    /// Returns the segment.
    #[must_use]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Returns the segment for modification.
    pub fn segment_mut(&mut self) -> &mut Segment {
        &mut self.segment
    }

    /// Splits the pair into its parts.
    #[must_use]
    pub fn into_parts(self) -> (AtomKey, Segment) {
        (self.key, self.segment)
    }
}
