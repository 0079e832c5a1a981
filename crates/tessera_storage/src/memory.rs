//! In-memory storage backend.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::key::AtomKey;
use crate::library::LibraryPath;
use crate::segment::{KeySegmentPair, Segment};
use crate::storage::{ensure_writable, OpenMode, ReadKeyOpts, RemoveOpts, Storage, UpdateOpts};

/// A storage backend holding segments in a map.
///
/// Nothing survives the process. Uniqueness and absence behave exactly as
/// in the embedded backend, which makes this the reference implementation
/// for backend-agnostic behavior.
///
/// # Thread Safety
///
/// The map is guarded by a single read-write lock, so a storage can be
/// shared across threads.
///
/// # Example
///
/// ```rust
/// use tessera_storage::{
///     KeyBuilder, KeySegmentPair, KeyType, LibraryPath, MemoryStorage, OpenMode,
///     ReadKeyOpts, Segment, Storage,
/// };
///
/// let storage = MemoryStorage::new(LibraryPath::new(["a", "b"]).unwrap(), OpenMode::Write);
/// let key = KeyBuilder::new(KeyType::Version).version_id(0).symbol("sym").build().unwrap();
///
/// storage
///     .write(KeySegmentPair::with_segment(key.clone(), Segment::with_buffer(b"data".to_vec())))
///     .unwrap();
/// let segment = storage.read(&key, ReadKeyOpts::default()).unwrap();
/// assert_eq!(segment.buffer(), b"data");
/// ```
#[derive(Debug)]
pub struct MemoryStorage {
    library_path: LibraryPath,
    mode: OpenMode,
    segments: RwLock<HashMap<AtomKey, Segment>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new(library_path: LibraryPath, mode: OpenMode) -> Self {
        Self {
            library_path,
            mode,
            segments: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn library_path(&self) -> &LibraryPath {
        &self.library_path
    }

    fn open_mode(&self) -> OpenMode {
        self.mode
    }

    fn write(&self, pair: KeySegmentPair) -> StorageResult<()> {
        ensure_writable(self.mode, "write")?;
        let (key, segment) = pair.into_parts();
        debug!(library = %self.library_path, %key, "memory write");

        let mut segments = self.segments.write();
        if segments.contains_key(&key) {
            return Err(StorageError::DuplicateKey { key });
        }
        segments.insert(key, segment);
        Ok(())
    }

    fn read(&self, key: &AtomKey, opts: ReadKeyOpts) -> StorageResult<Segment> {
        debug!(library = %self.library_path, %key, "memory read");
        match self.segments.read().get(key) {
            Some(segment) => Ok(segment.clone()),
            None => {
                if !opts.dont_warn_about_missing_key {
                    warn!(library = %self.library_path, %key, "read of missing key");
                }
                Err(StorageError::KeyNotFound { key: key.clone() })
            }
        }
    }

    fn update(&self, pair: KeySegmentPair, opts: UpdateOpts) -> StorageResult<()> {
        ensure_writable(self.mode, "update")?;
        let (key, segment) = pair.into_parts();
        debug!(library = %self.library_path, %key, upsert = opts.upsert, "memory update");

        let mut segments = self.segments.write();
        if !opts.upsert && !segments.contains_key(&key) {
            return Err(StorageError::KeyNotFound { key });
        }
        segments.insert(key, segment);
        Ok(())
    }

    fn remove(&self, key: &AtomKey, opts: RemoveOpts) -> StorageResult<()> {
        ensure_writable(self.mode, "remove")?;
        debug!(library = %self.library_path, %key, "memory remove");

        if self.segments.write().remove(key).is_none() && !opts.ignores_missing_key {
            return Err(StorageError::KeyNotFound { key: key.clone() });
        }
        Ok(())
    }

    fn key_exists(&self, key: &AtomKey) -> StorageResult<bool> {
        Ok(self.segments.read().contains_key(key))
    }
}
