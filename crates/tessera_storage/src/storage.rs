//! The storage contract shared by every backend.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::key::AtomKey;
use crate::library::LibraryPath;
use crate::segment::{KeySegmentPair, Segment};

/// Access mode a storage is opened with.
///
/// Checked on every mutating call, not only when opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Reads and existence checks only.
    Read,
    /// All operations.
    Write,
}

impl OpenMode {
    /// Whether mutating operations are allowed.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Options for [`Storage::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadKeyOpts {
    /// Do not log a warning when the key is missing. The error is still
    /// returned.
    pub dont_warn_about_missing_key: bool,
}

/// Options for [`Storage::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOpts {
    /// Create the key if it is absent instead of failing.
    pub upsert: bool,
}

/// Options for [`Storage::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOpts {
    /// Treat removal of an absent key as success.
    pub ignores_missing_key: bool,
}

/// A key-segment store.
///
/// Backends differ in a few deliberate ways, all visible through the
/// errors they return:
///
/// | operation          | embedded / memory        | object store       |
/// |--------------------|--------------------------|--------------------|
/// | write existing key | `DuplicateKey`           | overwrites         |
/// | update absent key  | `KeyNotFound`            | creates            |
/// | read absent key    | `KeyNotFound`            | `KeyNotFound`      |
/// | remove absent key  | `KeyNotFound`            | `KeyNotFound`      |
///
/// Every call is synchronous and is attempted exactly once. Errors carry
/// an [`crate::ErrorKind`] when they belong to the shared taxonomy.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// The namespace this storage was opened under.
    fn library_path(&self) -> &LibraryPath;

    /// The mode this storage was opened with.
    fn open_mode(&self) -> OpenMode;

    /// Persists `pair`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ModeViolation`] unless opened for writing
    /// - [`StorageError::DuplicateKey`] if the backend enforces uniqueness
    ///   and the key exists
    fn write(&self, pair: KeySegmentPair) -> StorageResult<()>;

    /// Reads the segment stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::KeyNotFound`] if the key is absent
    /// - [`StorageError::Permission`], [`StorageError::Retryable`] or
    ///   [`StorageError::Unexpected`] for remote failures
    fn read(&self, key: &AtomKey, opts: ReadKeyOpts) -> StorageResult<Segment>;

    /// Replaces the segment stored under the pair's key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ModeViolation`] unless opened for writing
    /// - [`StorageError::KeyNotFound`] if the key is absent, unless the
    ///   backend upserts natively or `opts.upsert` is set
    fn update(&self, pair: KeySegmentPair, opts: UpdateOpts) -> StorageResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ModeViolation`] unless opened for writing
    /// - [`StorageError::KeyNotFound`] if the key is absent, unless
    ///   `opts.ignores_missing_key` is set
    fn remove(&self, key: &AtomKey, opts: RemoveOpts) -> StorageResult<()>;

    /// Checks whether `key` is present.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures are returned; absence is `Ok(false)`.
    fn key_exists(&self, key: &AtomKey) -> StorageResult<bool>;
}

/// Fails with [`StorageError::ModeViolation`] unless `mode` allows writes.
pub(crate) fn ensure_writable(mode: OpenMode, operation: &'static str) -> StorageResult<()> {
    if mode.can_write() {
        Ok(())
    } else {
        Err(StorageError::ModeViolation { operation, mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_strict() {
        assert!(!UpdateOpts::default().upsert);
        assert!(!RemoveOpts::default().ignores_missing_key);
        assert!(!ReadKeyOpts::default().dont_warn_about_missing_key);
    }

    #[test]
    fn read_mode_rejects_mutation() {
        let err = ensure_writable(OpenMode::Read, "write").unwrap_err();
        assert!(matches!(
            err,
            StorageError::ModeViolation {
                operation: "write",
                mode: OpenMode::Read
            }
        ));
        assert!(ensure_writable(OpenMode::Write, "write").is_ok());
    }

    #[test]
    fn opened_storage_result_is_debuggable() {
        let opened: StorageResult<Box<dyn Storage>> = Ok(Box::new(crate::MemoryStorage::new(
            crate::LibraryPath::new(["lib"]).unwrap(),
            OpenMode::Read,
        )));
        let storage = opened.unwrap();
        assert!(format!("{storage:?}").contains("MemoryStorage"));

        let failed: StorageResult<Box<dyn Storage>> = Err(StorageError::config("bad"));
        assert!(matches!(failed.unwrap_err(), StorageError::Config { .. }));
    }
}
