//! Storage fixtures for every backend.
//!
//! Each [`StorageFactory`] creates a fresh, empty storage opened for
//! writing. On-disk fixtures keep their temporary directory alive for as
//! long as the returned [`TestStorage`] lives.

use std::ops::Deref;
use tempfile::TempDir;
use tessera_storage::{
    AtomKey, EmbeddedConfig, EmbeddedStorage, KeyBuilder, KeySegmentPair, KeyType, LibraryPath,
    MemoryStorage, MockObjectStoreClient, ObjectStoreConfig, ObjectStoreStorage, OpenMode, Segment,
    Storage, DEFAULT_MAP_SIZE,
};

/// Start timestamp written into every fixture segment header.
pub const FIXTURE_START_TS: i64 = 1234;

/// Deliberate semantic differences between backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendBehavior {
    /// `write` of an existing key fails with `DuplicateKey`.
    pub enforces_unique_keys: bool,
    /// `update` of an absent key creates it.
    pub upserts_natively: bool,
}

impl BackendBehavior {
    /// Embedded and memory backends.
    pub const STRICT: Self = Self {
        enforces_unique_keys: true,
        upserts_natively: false,
    };

    /// Object-store backends.
    pub const OVERWRITING: Self = Self {
        enforces_unique_keys: false,
        upserts_natively: true,
    };
}

/// A storage under test with automatic cleanup.
pub struct TestStorage {
    /// The storage instance.
    pub storage: Box<dyn Storage>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStorage {
    /// Wraps a storage that needs no cleanup.
    pub fn ephemeral(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            _temp_dir: None,
        }
    }

    /// Wraps a storage whose files live in `temp_dir`.
    pub fn on_disk(storage: Box<dyn Storage>, temp_dir: TempDir) -> Self {
        Self {
            storage,
            _temp_dir: Some(temp_dir),
        }
    }
}

impl Deref for TestStorage {
    type Target = dyn Storage;

    fn deref(&self) -> &Self::Target {
        &*self.storage
    }
}

/// Creates fresh storages of one backend.
pub trait StorageFactory {
    /// Backend name, used in assertion messages.
    fn name(&self) -> &'static str;

    /// The backend's deliberate divergences.
    fn behavior(&self) -> BackendBehavior;

    /// Creates an empty storage opened for writing.
    fn create(&self) -> TestStorage;
}

/// Embedded environments in a temporary directory.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFactory {
    /// Capacity of each environment.
    pub map_size: u64,
}

impl EmbeddedFactory {
    /// Factory with the given capacity.
    pub fn with_map_size(map_size: u64) -> Self {
        Self { map_size }
    }
}

impl Default for EmbeddedFactory {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
        }
    }
}

impl StorageFactory for EmbeddedFactory {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn behavior(&self) -> BackendBehavior {
        BackendBehavior::STRICT
    }

    fn create(&self) -> TestStorage {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = EmbeddedConfig::new(temp_dir.path())
            .map_size(self.map_size)
            .recreate_if_exists(true);
        let storage = EmbeddedStorage::open(library_path(), OpenMode::Write, &config)
            .expect("Failed to open embedded storage");
        TestStorage::on_disk(Box::new(storage), temp_dir)
    }
}

/// In-memory storages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFactory;

impl StorageFactory for MemoryFactory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn behavior(&self) -> BackendBehavior {
        BackendBehavior::STRICT
    }

    fn create(&self) -> TestStorage {
        TestStorage::ephemeral(Box::new(MemoryStorage::new(
            library_path(),
            OpenMode::Write,
        )))
    }
}

/// Object-store storages backed by the fault-injecting client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockObjectStoreFactory;

impl StorageFactory for MockObjectStoreFactory {
    fn name(&self) -> &'static str {
        "object_store"
    }

    fn behavior(&self) -> BackendBehavior {
        BackendBehavior::OVERWRITING
    }

    fn create(&self) -> TestStorage {
        let library = LibraryPath::from_delimited("lib", '.').expect("valid library name");
        let config = ObjectStoreConfig::new("test-bucket").use_mock_storage_for_testing(true);
        TestStorage::ephemeral(Box::new(ObjectStoreStorage::with_client(
            library,
            OpenMode::Write,
            &config,
            Box::new(MockObjectStoreClient::new()),
        )))
    }
}

/// One factory per backend.
pub fn all_factories() -> Vec<Box<dyn StorageFactory>> {
    vec![
        Box::new(EmbeddedFactory::default()),
        Box::new(MemoryFactory),
        Box::new(MockObjectStoreFactory),
    ]
}

/// The library path used by fixtures.
pub fn library_path() -> LibraryPath {
    LibraryPath::new(["a", "b"]).expect("valid library path")
}

/// A version key with id 0 for `symbol`.
pub fn test_key(symbol: &str) -> AtomKey {
    KeyBuilder::new(KeyType::Version)
        .version_id(0)
        .symbol(symbol)
        .build()
        .expect("Failed to build key")
}

/// A pair for `symbol` carrying `payload` and the fixture start timestamp.
pub fn test_pair(symbol: &str, payload: &[u8]) -> KeySegmentPair {
    let mut segment = Segment::with_buffer(payload.to_vec());
    segment.header_mut().start_ts = FIXTURE_START_TS;
    KeySegmentPair::with_segment(test_key(symbol), segment)
}
