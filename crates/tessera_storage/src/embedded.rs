//! Storage backend over the embedded engine.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::EmbeddedConfig;
use crate::engine::{EngineError, EnvOptions, EnvStats, Environment, PutFlags};
use crate::error::{StorageError, StorageResult};
use crate::key::AtomKey;
use crate::library::LibraryPath;
use crate::segment::{KeySegmentPair, Segment};
use crate::storage::{ensure_writable, OpenMode, ReadKeyOpts, RemoveOpts, Storage, UpdateOpts};

/// A storage backend persisting segments in an embedded [`Environment`].
///
/// Each library gets its own environment directory below the configured
/// root, named by the dotted library path.
///
/// # Capacity
///
/// The environment is opened with a fixed byte capacity, charged on live
/// records once superseded ones are compacted away. Running out of it
/// is reported as `StorageError::Engine(EngineError::MapFull { .. })`, which
/// has no [`crate::ErrorKind`]: it is a configuration fault, not a data
/// fault, and retrying does not help.
#[derive(Debug)]
pub struct EmbeddedStorage {
    library_path: LibraryPath,
    mode: OpenMode,
    env: Environment,
}

impl EmbeddedStorage {
    /// Opens the environment for `library_path` under `config.path`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Config`] if `recreate_if_exists` is requested in
    ///   read mode
    /// - [`StorageError::Engine`] if the environment cannot be opened,
    ///   including a read-mode open of an environment that does not exist
    ///
    /// A read-mode open never creates, truncates or compacts anything.
    pub fn open(
        library_path: LibraryPath,
        mode: OpenMode,
        config: &EmbeddedConfig,
    ) -> StorageResult<Self> {
        if config.recreate_if_exists && !mode.can_write() {
            return Err(StorageError::config(
                "recreate_if_exists requires write mode",
            ));
        }

        let dir = Self::environment_dir(&config.path, &library_path);
        let env = Environment::open(
            &dir,
            EnvOptions {
                map_size: config.map_size,
                recreate_if_exists: config.recreate_if_exists,
                read_only: !mode.can_write(),
            },
        )?;

        Ok(Self {
            library_path,
            mode,
            env,
        })
    }

    /// Directory holding the environment of `library_path` under `root`.
    #[must_use]
    pub fn environment_dir(root: &Path, library_path: &LibraryPath) -> PathBuf {
        root.join(library_path.to_delimited('.'))
    }

    /// Returns usage figures of the underlying environment.
    #[must_use]
    pub fn stats(&self) -> EnvStats {
        self.env.stats()
    }

    /// Returns every stored key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if a stored key cannot be decoded.
    pub fn keys(&self) -> StorageResult<Vec<AtomKey>> {
        self.env
            .keys()
            .iter()
            .map(|raw| AtomKey::decode(raw).map_err(StorageError::from))
            .collect()
    }
}

/// Maps a native engine error to the taxonomy.
///
/// Only key existence and absence are classified. Everything else,
/// capacity exhaustion included, is passed through as
/// [`StorageError::Engine`].
fn classify(err: EngineError, key: &AtomKey) -> StorageError {
    match err {
        EngineError::KeyExists => StorageError::DuplicateKey { key: key.clone() },
        EngineError::NotFound => StorageError::KeyNotFound { key: key.clone() },
        native @ (EngineError::MapFull { .. }
        | EngineError::Locked { .. }
        | EngineError::MissingEnvironment { .. }
        | EngineError::ReadOnly
        | EngineError::ReadPastEnd { .. }
        | EngineError::Corrupted { .. }
        | EngineError::InvalidOptions(_)
        | EngineError::Io(_)) => {
            if matches!(native, EngineError::MapFull { .. }) {
                warn!(%key, error = %native, "embedded environment is out of capacity");
            }
            StorageError::Engine(native)
        }
    }
}

impl Storage for EmbeddedStorage {
    fn name(&self) -> &'static str {
        "embedded"
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
        debug!(library = %self.library_path, %key, bytes = segment.buffer().len(), "embedded write");

        let raw = key.encode();
        let image = segment.encode();
        self.env
            .write(|txn| txn.put(&raw, image, PutFlags { no_overwrite: true }))
            .map_err(|e| classify(e, &key))
    }

    fn read(&self, key: &AtomKey, opts: ReadKeyOpts) -> StorageResult<Segment> {
        debug!(library = %self.library_path, %key, "embedded read");
        match self.env.get(&key.encode()).map_err(|e| classify(e, key))? {
            Some(image) => Segment::decode(&image),
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
        debug!(library = %self.library_path, %key, upsert = opts.upsert, "embedded update");

        let raw = key.encode();
        let image = segment.encode();
        self.env
            .write(|txn| {
                if !opts.upsert && !txn.contains(&raw) {
                    return Err(EngineError::NotFound);
                }
                txn.put(&raw, image, PutFlags::default())
            })
            .map_err(|e| classify(e, &key))
    }

    fn remove(&self, key: &AtomKey, opts: RemoveOpts) -> StorageResult<()> {
        ensure_writable(self.mode, "remove")?;
        debug!(library = %self.library_path, %key, "embedded remove");

        let raw = key.encode();
        match self.env.write(|txn| txn.delete(&raw)) {
            Err(EngineError::NotFound) if opts.ignores_missing_key => Ok(()),
            result => result.map_err(|e| classify(e, key)),
        }
    }

    fn key_exists(&self, key: &AtomKey) -> StorageResult<bool> {
        Ok(self.env.contains(&key.encode()))
    }
}
