//! Native error type of the embedded engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by [`super::Environment`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Live data plus the commit exceed the configured capacity, even after
    /// superseded records were compacted away.
    ///
    /// The transaction is not applied. Retrying does not help; data must be
    /// removed or the environment reopened with a larger `map_size`.
    #[error("map full: commit needs {required} bytes, capacity is {capacity}")]
    MapFull {
        /// Data file size the commit would have produced after compaction.
        required: u64,
        /// Configured capacity in bytes.
        capacity: u64,
    },

    /// `put` with `no_overwrite` on a key that is present.
    #[error("key exists")]
    KeyExists,

    /// `delete` of a key that is not present.
    #[error("key not found")]
    NotFound,

    /// Another handle holds the environment's lock.
    #[error("environment locked: {path}")]
    Locked {
        /// The environment directory.
        path: PathBuf,
    },

    /// A read-only open found no environment in the directory.
    #[error("no environment at {path}")]
    MissingEnvironment {
        /// The environment directory.
        path: PathBuf,
    },

    /// A write transaction was started on a read-only environment.
    #[error("environment is read-only")]
    ReadOnly,

    /// Attempted to read beyond the end of the data file.
    #[error("read beyond end of data file: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// A record failed validation.
    #[error("corrupted record at offset {offset}: {message}")]
    Corrupted {
        /// Offset of the bad record.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// The open options are unusable.
    #[error("invalid environment options: {0}")]
    InvalidOptions(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }
}
