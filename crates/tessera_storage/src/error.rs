//! Error types for storage operations.
//!
//! Every backend reports failures through [`StorageError`]. Five of its
//! variants form the backend-agnostic taxonomy ([`ErrorKind`]); callers
//! branch on [`StorageError::kind`] and never on which backend produced the
//! error. The remaining variants carry failures that are deliberately left
//! unclassified, most notably the embedded engine's capacity exhaustion.

use std::io;
use thiserror::Error;

use crate::engine::EngineError;
use crate::key::{AtomKey, KeyError};
use crate::storage::OpenMode;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The shared, backend-agnostic error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key already exists on a backend that enforces uniqueness.
    DuplicateKey,
    /// The key was verified absent.
    KeyNotFound,
    /// Credentials or ACLs denied the operation.
    Permission,
    /// Transient infrastructure fault; safe to retry.
    Retryable,
    /// Unclassified native failure.
    Unexpected,
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Write of a key that already exists.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The key that already exists.
        key: AtomKey,
    },

    /// Read, update or remove of an absent key.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: AtomKey,
    },

    /// Credential or ACL denial.
    #[error("permission denied on {operation} of {key}: {message}")]
    Permission {
        /// The native operation that was refused.
        operation: &'static str,
        /// The key being accessed.
        key: AtomKey,
        /// The backend's message.
        message: String,
    },

    /// Transient infrastructure fault. This layer never retries.
    #[error("retryable failure on {operation} of {key}: {message}")]
    Retryable {
        /// The native operation that failed.
        operation: &'static str,
        /// The key being accessed.
        key: AtomKey,
        /// The backend's message.
        message: String,
    },

    /// Native failure that no table classifies.
    #[error("unexpected failure on {operation} of {key}: {message}")]
    Unexpected {
        /// The native operation that failed.
        operation: &'static str,
        /// The key being accessed.
        key: AtomKey,
        /// The backend's message.
        message: String,
    },

    /// Embedded engine failure left in its native form, including
    /// [`EngineError::MapFull`].
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Mutating call on a storage not opened for writing.
    #[error("{operation} requires write mode, storage is open in {mode:?} mode")]
    ModeViolation {
        /// The refused operation.
        operation: &'static str,
        /// The mode the storage was opened with.
        mode: OpenMode,
    },

    /// A key could not be built or decoded.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Invalid storage configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Stored data could not be parsed.
    #[error("storage corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Returns the taxonomy kind, or `None` for unclassified failures.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::DuplicateKey { .. } => Some(ErrorKind::DuplicateKey),
            Self::KeyNotFound { .. } => Some(ErrorKind::KeyNotFound),
            Self::Permission { .. } => Some(ErrorKind::Permission),
            Self::Retryable { .. } => Some(ErrorKind::Retryable),
            Self::Unexpected { .. } => Some(ErrorKind::Unexpected),
            Self::Engine(_)
            | Self::ModeViolation { .. }
            | Self::InvalidKey(_)
            | Self::Config { .. }
            | Self::Corrupted { .. }
            | Self::Io(_) => None,
        }
    }

    /// Whether the caller may retry the failed call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == Some(ErrorKind::Retryable)
    }

    /// Whether the error is the embedded engine running out of capacity.
    #[must_use]
    pub fn is_capacity_exhausted(&self) -> bool {
        matches!(self, Self::Engine(EngineError::MapFull { .. }))
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}
