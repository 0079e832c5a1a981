//! Error behavior of every storage backend.

use tessera_storage::{
    EngineError, ErrorKind, LibraryPath, MemoryConfig, MockObjectStoreClient, ObjectOperation,
    ObjectStoreConfig, ObjectStoreErrorCode, OpenMode, ReadKeyOpts, RemoveOpts, StorageConfig,
    StorageError, UpdateOpts,
};
use tessera_testkit::prelude::*;

const CAPACITY: u64 = 32 * 1024;
const OVERSIZED: usize = 40_000;

fn fault_symbol(op: ObjectOperation, code: ObjectStoreErrorCode, retryable: bool) -> String {
    MockObjectStoreClient::fault_trigger("sym", op, code, retryable)
}

#[test]
fn every_backend_conforms() {
    for factory in all_factories() {
        run_conformance(factory.as_ref());
    }
}

#[test]
fn duplicate_write_per_backend() {
    for factory in all_factories() {
        let storage = factory.create();
        assert_duplicate_write(&*storage, factory.behavior(), "dup");
    }
}

#[test]
fn missing_key_is_key_not_found_everywhere() {
    for factory in all_factories() {
        let storage = factory.create();
        let key = test_key("absent");

        let read = storage.read(&key, ReadKeyOpts::default()).unwrap_err();
        assert!(matches!(read, StorageError::KeyNotFound { .. }), "{}", factory.name());

        let remove = storage.remove(&key, RemoveOpts::default()).unwrap_err();
        assert_eq!(remove.kind(), Some(ErrorKind::KeyNotFound), "{}", factory.name());
    }
}

#[test]
fn update_of_missing_key_follows_backend_behavior() {
    for factory in all_factories() {
        let storage = factory.create();
        let result = storage.update(test_pair("fresh", b"v"), UpdateOpts::default());
        if factory.behavior().upserts_natively {
            assert!(result.is_ok(), "{}", factory.name());
        } else {
            assert_eq!(
                result.unwrap_err().kind(),
                Some(ErrorKind::KeyNotFound),
                "{}",
                factory.name()
            );
        }
    }
}

#[test]
fn exists_lifecycle_everywhere() {
    for factory in all_factories() {
        assert_exists_lifecycle(&*factory.create(), "life");
    }
}

#[test]
fn embedded_capacity_is_exhausted_by_large_segment() {
    let storage = EmbeddedFactory::with_map_size(CAPACITY).create();
    let err = storage
        .write(test_pair("big", &vec![7u8; OVERSIZED]))
        .unwrap_err();

    assert!(matches!(err, StorageError::Engine(EngineError::MapFull { .. })));
    assert!(err.is_capacity_exhausted());
    assert_eq!(err.kind(), None);
    assert!(!storage.key_exists(&test_key("big")).unwrap());

    // A small write still fits after the failed one.
    storage.write(test_pair("small", b"ok")).unwrap();
}

#[test]
fn embedded_updates_of_one_key_stay_within_capacity() {
    let storage = EmbeddedFactory::with_map_size(CAPACITY).create();
    storage.write(test_pair("sym", &[0u8; 4096])).unwrap();

    for round in 1..=50u8 {
        storage
            .update(test_pair("sym", &[round; 4096]), UpdateOpts::default())
            .unwrap();
    }

    let segment = storage.read(&test_key("sym"), ReadKeyOpts::default()).unwrap();
    assert_eq!(segment.buffer(), [50u8; 4096].as_slice());
}

#[test]
fn embedded_read_mode_needs_existing_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::Embedded(tessera_storage::EmbeddedConfig::new(dir.path()));

    let err = config.open(library_path(), OpenMode::Read).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Engine(EngineError::MissingEnvironment { .. })
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn embedded_readers_share_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::Embedded(tessera_storage::EmbeddedConfig::new(dir.path()));
    {
        let writer = config.open(library_path(), OpenMode::Write).unwrap();
        writer.write(test_pair("sym", b"shared")).unwrap();
    }

    let first = config.open(library_path(), OpenMode::Read).unwrap();
    let second = config.open(library_path(), OpenMode::Read).unwrap();
    for storage in [first, second] {
        let segment = storage.read(&test_key("sym"), ReadKeyOpts::default()).unwrap();
        assert_eq!(segment.buffer(), b"shared");
    }
}

#[test]
fn memory_accepts_segment_that_overflows_embedded() {
    let storage = MemoryFactory.create();
    storage
        .write(test_pair("big", &vec![7u8; OVERSIZED]))
        .unwrap();
    let segment = storage.read(&test_key("big"), ReadKeyOpts::default()).unwrap();
    assert_eq!(segment.buffer().len(), OVERSIZED);
}

#[test]
fn injected_get_no_such_key_is_key_not_found() {
    let storage = MockObjectStoreFactory.create();
    let symbol = fault_symbol(ObjectOperation::Get, ObjectStoreErrorCode::NoSuchKey, false);
    storage.write(test_pair(&symbol, b"present")).unwrap();

    let err = storage.read(&test_key(&symbol), ReadKeyOpts::default()).unwrap_err();
    assert!(matches!(err, StorageError::KeyNotFound { .. }));
}

#[test]
fn injected_get_access_denied_is_permission() {
    let storage = MockObjectStoreFactory.create();
    let symbol = fault_symbol(ObjectOperation::Get, ObjectStoreErrorCode::AccessDenied, false);

    let err = storage.read(&test_key(&symbol), ReadKeyOpts::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Permission));
}

#[test]
fn injected_delete_access_denied_is_permission() {
    let storage = MockObjectStoreFactory.create();
    let symbol = fault_symbol(ObjectOperation::Delete, ObjectStoreErrorCode::AccessDenied, false);
    storage.write(test_pair(&symbol, b"v")).unwrap();

    let err = storage
        .remove(&test_key(&symbol), RemoveOpts::default())
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Permission));

    // The failed delete left the object in place.
    assert!(storage.key_exists(&test_key(&symbol)).unwrap());
}

#[test]
fn injected_delete_access_denied_is_not_ignored() {
    let storage = MockObjectStoreFactory.create();
    let symbol = fault_symbol(ObjectOperation::Delete, ObjectStoreErrorCode::AccessDenied, false);

    let err = storage
        .remove(
            &test_key(&symbol),
            RemoveOpts {
                ignores_missing_key: true,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Permission));
}

#[test]
fn injected_put_invalid_access_key_is_permission_on_update() {
    let storage = MockObjectStoreFactory.create();
    let symbol = fault_symbol(ObjectOperation::Put, ObjectStoreErrorCode::InvalidAccessKeyId, false);

    let err = storage
        .update(test_pair(&symbol, b"v"), UpdateOpts::default())
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Permission));
    assert!(!storage.key_exists(&test_key(&symbol)).unwrap());
}

#[test]
fn injected_network_error_follows_retryable_flag() {
    let storage = MockObjectStoreFactory.create();

    let retryable = fault_symbol(ObjectOperation::Get, ObjectStoreErrorCode::NetworkConnection, true);
    let err = storage.read(&test_key(&retryable), ReadKeyOpts::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Retryable));
    assert!(err.is_retryable());

    let fatal = fault_symbol(ObjectOperation::Get, ObjectStoreErrorCode::NetworkConnection, false);
    let err = storage.read(&test_key(&fatal), ReadKeyOpts::default()).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unexpected));
    assert!(!err.is_retryable());
}

#[test]
fn object_store_write_twice_keeps_second_payload() {
    let storage = MockObjectStoreFactory.create();
    storage.write(test_pair("sym", b"first")).unwrap();
    storage.write(test_pair("sym", b"second")).unwrap();

    let segment = storage.read(&test_key("sym"), ReadKeyOpts::default()).unwrap();
    assert_eq!(segment.buffer(), b"second");
    assert_eq!(segment.header().start_ts, FIXTURE_START_TS);
}

#[test]
fn read_mode_rejects_mutations_on_every_config() {
    let library = LibraryPath::from_delimited("lib", '.').unwrap();
    let dir = tempfile::tempdir().unwrap();
    let configs = [
        StorageConfig::Memory(MemoryConfig::default()),
        StorageConfig::ObjectStore(
            ObjectStoreConfig::new("bucket").use_mock_storage_for_testing(true),
        ),
        StorageConfig::Embedded(tessera_storage::EmbeddedConfig::new(dir.path())),
    ];
    // A read-mode open needs an existing embedded environment.
    drop(configs[2].open(library.clone(), OpenMode::Write).unwrap());

    for config in configs {
        let storage = config.open(library.clone(), OpenMode::Read).unwrap();
        for result in [
            storage.write(test_pair("sym", b"v")),
            storage.update(test_pair("sym", b"v"), UpdateOpts { upsert: true }),
            storage.remove(&test_key("sym"), RemoveOpts::default()),
        ] {
            assert!(
                matches!(result, Err(StorageError::ModeViolation { .. })),
                "{}",
                storage.name()
            );
        }
    }
}

#[test]
fn embedded_environment_is_exclusively_locked() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::Embedded(tessera_storage::EmbeddedConfig::new(dir.path()));
    let library = library_path();

    let _first = config.open(library.clone(), OpenMode::Write).unwrap();
    let err = config.open(library, OpenMode::Write).unwrap_err();
    assert!(matches!(err, StorageError::Engine(EngineError::Locked { .. })));
}
