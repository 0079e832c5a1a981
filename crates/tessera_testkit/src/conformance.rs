//! Assertions every storage backend must satisfy.
//!
//! Where backends deliberately diverge, the assertions take a
//! [`BackendBehavior`] and check the behavior the backend declares.

use tessera_storage::{ErrorKind, ReadKeyOpts, RemoveOpts, Storage, StorageError, UpdateOpts};

use crate::fixtures::{test_key, test_pair, BackendBehavior, StorageFactory};

fn expect_kind(result: Result<impl std::fmt::Debug, StorageError>, kind: ErrorKind, context: &str) {
    match result {
        Err(err) => assert_eq!(
            err.kind(),
            Some(kind),
            "{context}: expected {kind:?}, got {err}"
        ),
        Ok(value) => panic!("{context}: expected {kind:?}, got Ok({value:?})"),
    }
}

/// Writing a key twice is rejected, or overwrites on backends that do not
/// enforce uniqueness.
pub fn assert_duplicate_write(storage: &dyn Storage, behavior: BackendBehavior, symbol: &str) {
    storage
        .write(test_pair(symbol, b"first"))
        .expect("first write succeeds");
    assert!(storage.key_exists(&test_key(symbol)).unwrap());

    let second = storage.write(test_pair(symbol, b"second"));
    let stored = if behavior.enforces_unique_keys {
        expect_kind(second, ErrorKind::DuplicateKey, storage.name());
        b"first".as_slice()
    } else {
        second.expect("overwriting write succeeds");
        b"second".as_slice()
    };

    let segment = storage
        .read(&test_key(symbol), ReadKeyOpts::default())
        .expect("read after write");
    assert_eq!(segment.buffer(), stored, "{}", storage.name());
}

/// Reading a never-written key fails with `KeyNotFound`.
pub fn assert_read_missing(storage: &dyn Storage, symbol: &str) {
    let key = test_key(symbol);
    assert!(!storage.key_exists(&key).unwrap());
    expect_kind(
        storage.read(
            &key,
            ReadKeyOpts {
                dont_warn_about_missing_key: true,
            },
        ),
        ErrorKind::KeyNotFound,
        storage.name(),
    );
}

/// Updating a never-written key fails with `KeyNotFound`, or creates it on
/// backends that upsert natively.
pub fn assert_update_missing(storage: &dyn Storage, behavior: BackendBehavior, symbol: &str) {
    let key = test_key(symbol);
    assert!(!storage.key_exists(&key).unwrap());

    let result = storage.update(test_pair(symbol, b"updated"), UpdateOpts::default());
    if behavior.upserts_natively {
        result.expect("native upsert succeeds");
        let segment = storage.read(&key, ReadKeyOpts::default()).unwrap();
        assert_eq!(segment.buffer(), b"updated");
    } else {
        expect_kind(result, ErrorKind::KeyNotFound, storage.name());
        assert!(!storage.key_exists(&key).unwrap());
    }
}

/// `upsert` creates a missing key on every backend.
pub fn assert_upsert_creates(storage: &dyn Storage, symbol: &str) {
    storage
        .update(test_pair(symbol, b"upserted"), UpdateOpts { upsert: true })
        .expect("upsert succeeds");
    let segment = storage.read(&test_key(symbol), ReadKeyOpts::default()).unwrap();
    assert_eq!(segment.buffer(), b"upserted");
}

/// Removing a never-written key fails with `KeyNotFound` unless told to
/// ignore it.
pub fn assert_remove_missing(storage: &dyn Storage, symbol: &str) {
    let key = test_key(symbol);
    assert!(!storage.key_exists(&key).unwrap());
    expect_kind(
        storage.remove(&key, RemoveOpts::default()),
        ErrorKind::KeyNotFound,
        storage.name(),
    );
    storage
        .remove(
            &key,
            RemoveOpts {
                ignores_missing_key: true,
            },
        )
        .expect("ignored missing key");
}

/// `key_exists` is false before a write, true after it, and false after
/// removal.
pub fn assert_exists_lifecycle(storage: &dyn Storage, symbol: &str) {
    let key = test_key(symbol);
    assert!(!storage.key_exists(&key).unwrap(), "{}: before write", storage.name());

    storage.write(test_pair(symbol, b"")).expect("write succeeds");
    assert!(storage.key_exists(&key).unwrap(), "{}: after write", storage.name());

    storage
        .remove(&key, RemoveOpts::default())
        .expect("remove succeeds");
    assert!(!storage.key_exists(&key).unwrap(), "{}: after remove", storage.name());
}

/// Runs every assertion against fresh storages from `factory`.
pub fn run_conformance(factory: &dyn StorageFactory) {
    let behavior = factory.behavior();
    assert_duplicate_write(&*factory.create(), behavior, "sym");
    assert_read_missing(&*factory.create(), "sym");
    assert_update_missing(&*factory.create(), behavior, "sym");
    assert_upsert_creates(&*factory.create(), "sym");
    assert_remove_missing(&*factory.create(), "sym");
    assert_exists_lifecycle(&*factory.create(), "sym");
}
