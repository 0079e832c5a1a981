//! Storage backend over a remote object store.
//!
//! The wire protocol lives behind [`ObjectStoreClient`]. This module turns
//! the client's native error codes into the shared taxonomy:
//!
//! | native code                                                  | taxonomy       |
//! |--------------------------------------------------------------|----------------|
//! | `NoSuchKey`                                                  | `KeyNotFound`  |
//! | `AccessDenied`, `InvalidAccessKeyId`, `SignatureDoesNotMatch` | `Permission`   |
//! | anything else flagged retryable by the client                | `Retryable`    |
//! | anything else                                                | `Unexpected`   |

mod client;
#[cfg(any(test, feature = "testing"))]
mod mock;

pub use client::{
    ClientResult, ObjectOperation, ObjectStoreClient, ObjectStoreClientError, ObjectStoreErrorCode,
};
#[cfg(any(test, feature = "testing"))]
pub use mock::{FaultDescriptor, MockObjectStoreClient};

use tracing::{debug, warn};

use crate::config::ObjectStoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::key::AtomKey;
use crate::library::LibraryPath;
use crate::segment::{KeySegmentPair, Segment};
use crate::storage::{ensure_writable, OpenMode, ReadKeyOpts, RemoveOpts, Storage, UpdateOpts};

/// How a native code is treated before the retryable flag is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeClass {
    NotFound,
    Permission,
    /// Decided by the client's retryable flag.
    Infrastructure,
}

/// Native code table. Total over the known codes: no wildcard arm.
const fn code_class(code: ObjectStoreErrorCode) -> CodeClass {
    match code {
        ObjectStoreErrorCode::NoSuchKey => CodeClass::NotFound,
        ObjectStoreErrorCode::AccessDenied
        | ObjectStoreErrorCode::InvalidAccessKeyId
        | ObjectStoreErrorCode::SignatureDoesNotMatch => CodeClass::Permission,
        ObjectStoreErrorCode::NoSuchBucket
        | ObjectStoreErrorCode::NetworkConnection
        | ObjectStoreErrorCode::RequestTimeout
        | ObjectStoreErrorCode::SlowDown
        | ObjectStoreErrorCode::ServiceUnavailable
        | ObjectStoreErrorCode::InternalError
        | ObjectStoreErrorCode::InvalidRequest
        | ObjectStoreErrorCode::Unknown(_) => CodeClass::Infrastructure,
    }
}

fn classify(operation: ObjectOperation, err: ObjectStoreClientError, key: &AtomKey) -> StorageError {
    let key = key.clone();
    let operation = operation.as_str();
    match code_class(err.code) {
        CodeClass::NotFound => StorageError::KeyNotFound { key },
        CodeClass::Permission => StorageError::Permission {
            operation,
            key,
            message: err.to_string(),
        },
        CodeClass::Infrastructure if err.retryable => StorageError::Retryable {
            operation,
            key,
            message: err.to_string(),
        },
        CodeClass::Infrastructure => {
            warn!(operation, %key, error = %err, "unclassified object store error");
            StorageError::Unexpected {
                operation,
                key,
                message: err.to_string(),
            }
        }
    }
}

/// A storage backend writing each segment as one object.
///
/// Object names are `{prefix}/{library}/{type}/{symbol}*{version}*{ts}*{hash}`,
/// where `library` is the library path joined with `/` and `prefix` is the
/// optional configured root.
///
/// The backend keeps the remote store's semantics: writing an existing key
/// overwrites it and updating an absent key creates it. There is no local
/// locking; concurrency is left to the service and the client.
pub struct ObjectStoreStorage {
    library_path: LibraryPath,
    mode: OpenMode,
    bucket: String,
    prefix: String,
    client: Box<dyn ObjectStoreClient>,
}

impl ObjectStoreStorage {
    /// Creates a storage that issues its calls through `client`.
    #[must_use]
    pub fn with_client(
        library_path: LibraryPath,
        mode: OpenMode,
        config: &ObjectStoreConfig,
        client: Box<dyn ObjectStoreClient>,
    ) -> Self {
        let library = library_path.to_delimited('/');
        let prefix = match config.prefix.as_deref() {
            Some(root) if !root.is_empty() => format!("{}/{library}", root.trim_end_matches('/')),
            _ => library,
        };
        Self {
            library_path,
            mode,
            bucket: config.bucket.clone(),
            prefix,
            client,
        }
    }

    /// Returns the bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object name of `key`.
    #[must_use]
    pub fn object_name(&self, key: &AtomKey) -> String {
        format!("{}/{}", self.prefix, key.object_name())
    }

    fn put(&self, key: &AtomKey, segment: &Segment) -> StorageResult<()> {
        let name = self.object_name(key);
        self.client
            .put_object(&self.bucket, &name, segment.encode())
            .map_err(|e| classify(ObjectOperation::Put, e, key))
    }
}

impl std::fmt::Debug for ObjectStoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreStorage")
            .field("library_path", &self.library_path)
            .field("mode", &self.mode)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Storage for ObjectStoreStorage {
    fn name(&self) -> &'static str {
        "object_store"
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
        debug!(bucket = %self.bucket, %key, "object store write");
        self.put(&key, &segment)
    }

    fn read(&self, key: &AtomKey, opts: ReadKeyOpts) -> StorageResult<Segment> {
        debug!(bucket = %self.bucket, %key, "object store read");
        let name = self.object_name(key);
        match self.client.get_object(&self.bucket, &name) {
            Ok(body) => Segment::decode(&body),
            Err(err) => {
                let err = classify(ObjectOperation::Get, err, key);
                if matches!(err, StorageError::KeyNotFound { .. }) && !opts.dont_warn_about_missing_key {
                    warn!(bucket = %self.bucket, %key, "read of missing key");
                }
                Err(err)
            }
        }
    }

    fn update(&self, pair: KeySegmentPair, opts: UpdateOpts) -> StorageResult<()> {
        ensure_writable(self.mode, "update")?;
        let (key, segment) = pair.into_parts();
        debug!(bucket = %self.bucket, %key, upsert = opts.upsert, "object store update");
        self.put(&key, &segment)
    }

    fn remove(&self, key: &AtomKey, opts: RemoveOpts) -> StorageResult<()> {
        ensure_writable(self.mode, "remove")?;
        debug!(bucket = %self.bucket, %key, "object store remove");
        let name = self.object_name(key);
        match self.client.delete_object(&self.bucket, &name) {
            Ok(()) => Ok(()),
            Err(err) => match classify(ObjectOperation::Delete, err, key) {
                StorageError::KeyNotFound { .. } if opts.ignores_missing_key => Ok(()),
                other => Err(other),
            },
        }
    }

    fn key_exists(&self, key: &AtomKey) -> StorageResult<bool> {
        let name = self.object_name(key);
        match self.client.head_object(&self.bucket, &name) {
            Ok(()) => Ok(true),
            Err(err) => match classify(ObjectOperation::Head, err, key) {
                StorageError::KeyNotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::key::{KeyBuilder, KeyType};

    fn storage() -> ObjectStoreStorage {
        ObjectStoreStorage::with_client(
            LibraryPath::from_delimited("lib", '.').unwrap(),
            OpenMode::Write,
            &ObjectStoreConfig::new("bucket"),
            Box::new(MockObjectStoreClient::new()),
        )
    }

    fn key(symbol: &str) -> AtomKey {
        KeyBuilder::new(KeyType::Version)
            .version_id(0)
            .symbol(symbol)
            .build()
            .unwrap()
    }

    fn pair(key: AtomKey, payload: &[u8]) -> KeySegmentPair {
        KeySegmentPair::with_segment(key, Segment::with_buffer(payload.to_vec()))
    }

    #[test]
    fn every_known_code_has_a_class() {
        for code in ObjectStoreErrorCode::KNOWN {
            let err = classify(
                ObjectOperation::Get,
                ObjectStoreClientError::new(code, "x", false),
                &key("sym"),
            );
            assert!(err.kind().is_some(), "{code} produced an unclassified error");
        }
    }

    #[test]
    fn retryable_flag_splits_infrastructure_codes() {
        let retry = classify(
            ObjectOperation::Get,
            ObjectStoreClientError::new(ObjectStoreErrorCode::SlowDown, "slow", true),
            &key("sym"),
        );
        assert_eq!(retry.kind(), Some(ErrorKind::Retryable));

        let unknown = classify(
            ObjectOperation::Get,
            ObjectStoreClientError::new(ObjectStoreErrorCode::Unknown(4242), "??", false),
            &key("sym"),
        );
        assert_eq!(unknown.kind(), Some(ErrorKind::Unexpected));
    }

    #[test]
    fn permission_codes_ignore_retryable_flag() {
        let err = classify(
            ObjectOperation::Put,
            ObjectStoreClientError::new(ObjectStoreErrorCode::AccessDenied, "no", true),
            &key("sym"),
        );
        assert_eq!(err.kind(), Some(ErrorKind::Permission));
    }

    #[test]
    fn object_name_includes_library_and_prefix() {
        let storage = ObjectStoreStorage::with_client(
            LibraryPath::new(["team", "prices"]).unwrap(),
            OpenMode::Write,
            &ObjectStoreConfig::new("bucket").prefix("root/"),
            Box::new(MockObjectStoreClient::new()),
        );
        assert_eq!(storage.object_name(&key("sym")), "root/team/prices/v/sym*0**");
    }

    #[test]
    fn write_overwrites_existing_key() {
        let storage = storage();
        storage.write(pair(key("sym"), b"first")).unwrap();
        storage.write(pair(key("sym"), b"second")).unwrap();
        let segment = storage.read(&key("sym"), ReadKeyOpts::default()).unwrap();
        assert_eq!(segment.buffer(), b"second");
    }

    #[test]
    fn update_creates_missing_key() {
        let storage = storage();
        storage
            .update(pair(key("sym"), b"v"), UpdateOpts::default())
            .unwrap();
        assert!(storage.key_exists(&key("sym")).unwrap());
    }

    #[test]
    fn remove_and_exists() {
        let storage = storage();
        assert!(!storage.key_exists(&key("sym")).unwrap());
        storage.write(pair(key("sym"), b"v")).unwrap();
        assert!(storage.key_exists(&key("sym")).unwrap());
        storage.remove(&key("sym"), RemoveOpts::default()).unwrap();
        assert!(!storage.key_exists(&key("sym")).unwrap());
        assert!(matches!(
            storage.remove(&key("sym"), RemoveOpts::default()),
            Err(StorageError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn head_permission_error_propagates_from_key_exists() {
        let storage = storage();
        let symbol = MockObjectStoreClient::fault_trigger(
            "sym",
            ObjectOperation::Head,
            ObjectStoreErrorCode::AccessDenied,
            false,
        );
        let err = storage.key_exists(&key(&symbol)).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Permission));
    }

    #[test]
    fn read_only_storage_rejects_update() {
        let storage = ObjectStoreStorage::with_client(
            LibraryPath::new(["lib"]).unwrap(),
            OpenMode::Read,
            &ObjectStoreConfig::new("bucket"),
            Box::new(MockObjectStoreClient::new()),
        );
        assert!(matches!(
            storage.update(pair(key("sym"), b"v"), UpdateOpts::default()),
            Err(StorageError::ModeViolation { .. })
        ));
    }
}
