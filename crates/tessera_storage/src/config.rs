//! Storage configuration.
//!
//! A [`StorageConfig`] selects one backend and carries its settings. It
//! serializes as a JSON object tagged by `"type"`:
//!
//! ```json
//! { "type": "embedded", "path": "/var/lib/tessera", "map_size": 134217728 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embedded::EmbeddedStorage;
use crate::error::{StorageError, StorageResult};
use crate::library::LibraryPath;
use crate::memory::MemoryStorage;
use crate::object_store::ObjectStoreStorage;
use crate::storage::{OpenMode, Storage};

/// Default capacity of an embedded environment.
pub const DEFAULT_MAP_SIZE: u64 = 128 * 1024 * 1024; // 128 MB

fn default_map_size() -> u64 {
    DEFAULT_MAP_SIZE
}

/// Settings of the embedded backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedConfig {
    /// Root directory; each library gets a subdirectory.
    pub path: PathBuf,

    /// Capacity of each environment in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: u64,

    /// Discard existing content when opening.
    #[serde(default)]
    pub recreate_if_exists: bool,
}

impl EmbeddedConfig {
    /// Creates a configuration rooted at `path` with default settings.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            map_size: DEFAULT_MAP_SIZE,
            recreate_if_exists: false,
        }
    }

    /// Sets the environment capacity.
    #[must_use]
    pub fn map_size(mut self, size: u64) -> Self {
        self.map_size = size;
        self
    }

    /// Sets whether existing content is discarded on open.
    #[must_use]
    pub fn recreate_if_exists(mut self, value: bool) -> Self {
        self.recreate_if_exists = value;
        self
    }
}

/// Settings of the memory backend. There are none yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {}

/// Settings of the object-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Bucket holding the library's objects.
    pub bucket: String,

    /// Root prefix placed before the library path in object names.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Use the fault-injecting in-memory client instead of a remote one.
    #[serde(default)]
    pub use_mock_storage_for_testing: bool,
}

impl ObjectStoreConfig {
    /// Creates a configuration for `bucket` with default settings.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            use_mock_storage_for_testing: false,
        }
    }

    /// Sets the root prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Selects the fault-injecting client.
    #[must_use]
    pub fn use_mock_storage_for_testing(mut self, value: bool) -> Self {
        self.use_mock_storage_for_testing = value;
        self
    }
}

/// Backend selection plus its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Capacity-bounded on-disk engine.
    Embedded(EmbeddedConfig),
    /// Process-local map.
    Memory(MemoryConfig),
    /// Remote object store.
    ObjectStore(ObjectStoreConfig),
}

impl StorageConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the JSON is invalid.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json).map_err(|e| StorageError::config(e.to_string()))
    }

    /// Serializes the configuration to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if serialization fails.
    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::config(e.to_string()))
    }

    /// Opens the configured backend.
    ///
    /// An object store without `use_mock_storage_for_testing` needs a remote
    /// client, which the caller supplies through
    /// [`ObjectStoreStorage::with_client`]; this function refuses it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn open(&self, library_path: LibraryPath, mode: OpenMode) -> StorageResult<Box<dyn Storage>> {
        match self {
            Self::Embedded(config) => Ok(Box::new(EmbeddedStorage::open(
                library_path,
                mode,
                config,
            )?)),
            Self::Memory(_) => Ok(Box::new(MemoryStorage::new(library_path, mode))),
            Self::ObjectStore(config) => open_object_store(library_path, mode, config),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
fn open_object_store(
    library_path: LibraryPath,
    mode: OpenMode,
    config: &ObjectStoreConfig,
) -> StorageResult<Box<dyn Storage>> {
    if config.use_mock_storage_for_testing {
        let client = crate::object_store::MockObjectStoreClient::new();
        return Ok(Box::new(ObjectStoreStorage::with_client(
            library_path,
            mode,
            config,
            Box::new(client),
        )));
    }
    Err(remote_client_required())
}

#[cfg(not(any(test, feature = "testing")))]
fn open_object_store(
    _library_path: LibraryPath,
    _mode: OpenMode,
    config: &ObjectStoreConfig,
) -> StorageResult<Box<dyn Storage>> {
    if config.use_mock_storage_for_testing {
        return Err(StorageError::config(
            "use_mock_storage_for_testing requires the `testing` feature",
        ));
    }
    Err(remote_client_required())
}

fn remote_client_required() -> StorageError {
    StorageError::config(
        "object store needs a client; construct it with ObjectStoreStorage::with_client",
    )
}

/// Opens the backend selected by `config`.
///
/// # Errors
///
/// See [`StorageConfig::open`].
pub fn open_storage(
    library_path: LibraryPath,
    mode: OpenMode,
    config: &StorageConfig,
) -> StorageResult<Box<dyn Storage>> {
    config.open(library_path, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_defaults() {
        let config = EmbeddedConfig::new("/tmp/x");
        assert_eq!(config.map_size, DEFAULT_MAP_SIZE);
        assert!(!config.recreate_if_exists);
    }

    #[test]
    fn builder_pattern() {
        let config = EmbeddedConfig::new("/tmp/x")
            .map_size(32 * 1024)
            .recreate_if_exists(true);
        assert_eq!(config.map_size, 32 * 1024);
        assert!(config.recreate_if_exists);
    }

    #[test]
    fn json_missing_fields_take_defaults() {
        let config = StorageConfig::from_json(r#"{"type":"embedded","path":"/data"}"#).unwrap();
        assert_eq!(config, StorageConfig::Embedded(EmbeddedConfig::new("/data")));
    }

    #[test]
    fn json_object_store() {
        let config = StorageConfig::from_json(
            r#"{"type":"object_store","bucket":"b","use_mock_storage_for_testing":true}"#,
        )
        .unwrap();
        let StorageConfig::ObjectStore(os) = config else {
            panic!("expected object store config");
        };
        assert_eq!(os.bucket, "b");
        assert!(os.use_mock_storage_for_testing);
        assert_eq!(os.prefix, None);
    }

    #[test]
    fn object_store_json_carries_only_used_settings() {
        let json = StorageConfig::ObjectStore(ObjectStoreConfig::new("b"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let mut fields: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        fields.sort();
        assert_eq!(
            fields,
            ["bucket", "prefix", "type", "use_mock_storage_for_testing"]
        );
    }

    #[test]
    fn json_rejects_unknown_backend() {
        assert!(matches!(
            StorageConfig::from_json(r#"{"type":"tape"}"#),
            Err(StorageError::Config { .. })
        ));
    }

    #[test]
    fn to_json_roundtrip() {
        let config = StorageConfig::ObjectStore(ObjectStoreConfig::new("bucket").prefix("root"));
        let json = config.to_json().unwrap();
        assert_eq!(StorageConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn open_selects_backend() {
        let dir = tempdir().unwrap();
        let path = LibraryPath::new(["lib"]).unwrap();

        let embedded = StorageConfig::Embedded(EmbeddedConfig::new(dir.path()))
            .open(path.clone(), OpenMode::Write)
            .unwrap();
        assert_eq!(embedded.name(), "embedded");

        let memory = StorageConfig::Memory(MemoryConfig::default())
            .open(path.clone(), OpenMode::Write)
            .unwrap();
        assert_eq!(memory.name(), "memory");

        let mock = StorageConfig::ObjectStore(
            ObjectStoreConfig::new("bucket").use_mock_storage_for_testing(true),
        )
        .open(path.clone(), OpenMode::Write)
        .unwrap();
        assert_eq!(mock.name(), "object_store");
    }

    #[test]
    fn real_object_store_needs_a_client() {
        let result = open_storage(
            LibraryPath::new(["lib"]).unwrap(),
            OpenMode::Write,
            &StorageConfig::ObjectStore(ObjectStoreConfig::new("bucket")),
        );
        assert!(matches!(result, Err(StorageError::Config { .. })));
    }
}
