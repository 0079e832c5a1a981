//! # Tessera Storage
//!
//! Pluggable key-segment storage for Tessera.
//!
//! This crate is the lowest persistence layer of Tessera. It stores opaque
//! segments under composite [`AtomKey`]s and exposes a single [`Storage`]
//! contract over several backends. Native failures of each backend are
//! normalized into one [`StorageError`] taxonomy.
//!
//! ## Available Backends
//!
//! - [`EmbeddedStorage`] - Capacity-bounded on-disk environment
//! - [`MemoryStorage`] - Process-local map; the reference implementation
//! - [`ObjectStoreStorage`] - Remote object store behind [`ObjectStoreClient`]
//!
//! ## Error Taxonomy
//!
//! Callers branch on [`StorageError::kind`]:
//!
//! - [`ErrorKind::KeyNotFound`] - safe to create
//! - [`ErrorKind::Retryable`] - safe to retry
//! - anything else - fatal for that call
//!
//! Capacity exhaustion of the embedded engine has no kind. It surfaces as
//! [`StorageError::Engine`] wrapping [`EngineError::MapFull`].
//!
//! ## Example
//!
//! ```rust
//! use tessera_storage::{
//!     KeyBuilder, KeySegmentPair, KeyType, LibraryPath, MemoryConfig, OpenMode,
//!     ReadKeyOpts, Segment, Storage, StorageConfig, StorageError,
//! };
//!
//! let storage = StorageConfig::Memory(MemoryConfig::default())
//!     .open(LibraryPath::new(["a", "b"]).unwrap(), OpenMode::Write)
//!     .unwrap();
//!
//! let key = KeyBuilder::new(KeyType::Version).version_id(0).symbol("sym").build().unwrap();
//! storage
//!     .write(KeySegmentPair::with_segment(key.clone(), Segment::with_buffer(b"v1".to_vec())))
//!     .unwrap();
//!
//! let again = KeySegmentPair::with_segment(key.clone(), Segment::new());
//! assert!(matches!(storage.write(again), Err(StorageError::DuplicateKey { .. })));
//! assert_eq!(storage.read(&key, ReadKeyOpts::default()).unwrap().buffer(), b"v1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer_holder;
mod config;
mod embedded;
pub mod engine;
mod error;
mod key;
mod library;
mod memory;
pub mod object_store;
mod segment;
mod storage;

pub use buffer_holder::{BufferHolder, BufferId};
pub use config::{
    open_storage, EmbeddedConfig, MemoryConfig, ObjectStoreConfig, StorageConfig,
    DEFAULT_MAP_SIZE,
};
pub use embedded::EmbeddedStorage;
pub use engine::{EngineError, EnvStats};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use key::{AtomKey, KeyBuilder, KeyError, KeyType};
pub use library::LibraryPath;
pub use memory::MemoryStorage;
pub use object_store::{
    ObjectOperation, ObjectStoreClient, ObjectStoreClientError, ObjectStoreErrorCode,
    ObjectStoreStorage,
};
#[cfg(any(test, feature = "testing"))]
pub use object_store::{FaultDescriptor, MockObjectStoreClient};
pub use segment::{KeySegmentPair, Segment, SegmentHeader};
pub use storage::{OpenMode, ReadKeyOpts, RemoveOpts, Storage, UpdateOpts};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
