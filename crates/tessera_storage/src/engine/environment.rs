//! Capacity-bounded environment over a single data file.

use super::error::{EngineError, EngineResult};
use super::file::DataFile;
use super::record::{self, Record, CRC_SIZE, HEADER_SIZE};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LOCK_FILE: &str = "LOCK";
const DATA_FILE: &str = "data.tsdb";
const COMPACT_FILE: &str = "data.tsdb.compact";

/// Options for [`Environment::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOptions {
    /// Maximum size of the data file in bytes.
    pub map_size: u64,
    /// Discard existing content on open.
    pub recreate_if_exists: bool,
    /// Open an existing environment without modifying anything on disk.
    pub read_only: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            map_size: 128 * 1024 * 1024, // 128 MB
            recreate_if_exists: false,
            read_only: false,
        }
    }
}

/// Write flags for [`WriteTxn::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PutFlags {
    /// Fail with [`EngineError::KeyExists`] instead of replacing.
    pub no_overwrite: bool,
}

/// Usage figures for an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvStats {
    /// Environment directory.
    pub path: PathBuf,
    /// Configured capacity in bytes.
    pub map_size: u64,
    /// Bytes used by the data file, including superseded records not yet
    /// compacted away.
    pub used_bytes: u64,
    /// Bytes held by live records.
    pub live_bytes: u64,
    /// Number of live keys.
    pub entries: usize,
}

#[derive(Debug, Clone, Copy)]
struct Location {
    offset: u64,
    len: usize,
}

/// An embedded key-value environment with a fixed byte capacity.
///
/// Values are appended to a data file as checksummed records; an in-memory
/// index maps each live key to its latest record and is rebuilt on open.
///
/// # Capacity
///
/// `map_size` bounds the data file. When a commit would cross it, the
/// file is first compacted down to its live records; only if live data
/// plus the commit still exceed `map_size` does the commit fail with
/// [`EngineError::MapFull`].
///
/// # Concurrency
///
/// Single writer, multiple readers. [`Environment::write`] holds the writer
/// lock for the whole transaction; readers hold the index read lock while
/// they read a record. A writable environment locks its directory
/// exclusively; read-only handles share the lock.
#[derive(Debug)]
pub struct Environment {
    path: PathBuf,
    map_size: u64,
    read_only: bool,
    data: DataFile,
    index: RwLock<HashMap<Vec<u8>, Location>>,
    writer: Mutex<()>,
    _lock_file: File,
}

impl Environment {
    /// Opens the environment in directory `path`.
    ///
    /// A writable open creates the environment if needed. A read-only open
    /// requires it to exist and never writes to disk: a damaged tail is
    /// skipped instead of truncated.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingEnvironment`] if a read-only open finds no
    ///   environment
    /// - [`EngineError::Locked`] if another handle holds a conflicting lock
    /// - [`EngineError::InvalidOptions`] if `map_size` is zero, smaller
    ///   than the live data, or `recreate_if_exists` is combined with
    ///   `read_only`
    /// - [`EngineError::Corrupted`] if a record before the tail is damaged
    pub fn open(path: &Path, options: EnvOptions) -> EngineResult<Self> {
        if options.map_size == 0 {
            return Err(EngineError::InvalidOptions("map_size must be non-zero".into()));
        }
        if options.read_only && options.recreate_if_exists {
            return Err(EngineError::InvalidOptions(
                "recreate_if_exists requires a writable environment".into(),
            ));
        }

        let data_path = path.join(DATA_FILE);
        let (lock_file, data) = if options.read_only {
            let lock_path = path.join(LOCK_FILE);
            if !lock_path.is_file() || !data_path.is_file() {
                return Err(EngineError::MissingEnvironment {
                    path: path.to_path_buf(),
                });
            }
            let lock_file = OpenOptions::new().read(true).open(lock_path)?;
            if lock_file.try_lock_shared().is_err() {
                return Err(EngineError::Locked {
                    path: path.to_path_buf(),
                });
            }
            (lock_file, DataFile::open_read_only(&data_path)?)
        } else {
            fs::create_dir_all(path)?;
            let lock_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path.join(LOCK_FILE))?;
            if lock_file.try_lock_exclusive().is_err() {
                return Err(EngineError::Locked {
                    path: path.to_path_buf(),
                });
            }

            let leftover = path.join(COMPACT_FILE);
            if leftover.exists() {
                fs::remove_file(leftover)?;
            }
            (lock_file, DataFile::open(&data_path)?)
        };

        if options.recreate_if_exists && data.size() > 0 {
            info!(path = %path.display(), discarded = data.size(), "recreating environment");
            data.truncate(0)?;
        }

        let env = Self {
            path: path.to_path_buf(),
            map_size: options.map_size,
            read_only: options.read_only,
            data,
            index: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
            _lock_file: lock_file,
        };
        env.rebuild_index()?;

        if !env.read_only && env.data.size() > env.map_size {
            env.compact()?;
            if env.data.size() > env.map_size {
                return Err(EngineError::InvalidOptions(format!(
                    "live data ({} bytes) exceeds map_size {}",
                    env.data.size(),
                    env.map_size
                )));
            }
        }

        info!(
            path = %env.path.display(),
            map_size = env.map_size,
            read_only = env.read_only,
            entries = env.index.read().len(),
            "opened environment"
        );
        Ok(env)
    }

    /// Returns the environment directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured capacity in bytes.
    #[must_use]
    pub fn map_size(&self) -> u64 {
        self.map_size
    }

    /// Returns true if the environment was opened read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or fails validation.
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let index = self.index.read();
        let Some(location) = index.get(key).copied() else {
            return Ok(None);
        };
        let record = self.read_record(location)?;
        Ok(record.value)
    }

    /// Checks whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.read().contains_key(key)
    }

    /// Returns all live keys in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.index.read().keys().cloned().collect()
    }

    /// Returns usage figures.
    #[must_use]
    pub fn stats(&self) -> EnvStats {
        let index = self.index.read();
        EnvStats {
            path: self.path.clone(),
            map_size: self.map_size,
            used_bytes: self.data.size(),
            live_bytes: live_bytes(&index),
            entries: index.len(),
        }
    }

    /// Runs `f` inside a write transaction.
    ///
    /// Changes staged by `f` are committed atomically when it returns `Ok`
    /// and discarded when it returns `Err`. A commit that does not fit in
    /// `map_size`, even after compaction, fails with
    /// [`EngineError::MapFull`] and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReadOnly`] on a read-only environment, the
    /// error from `f`, [`EngineError::MapFull`], or an I/O error from the
    /// commit.
    pub fn write<F, R>(&self, f: F) -> EngineResult<R>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> EngineResult<R>,
    {
        if self.read_only {
            return Err(EngineError::ReadOnly);
        }

        let _writer = self.writer.lock();
        let mut txn = WriteTxn {
            env: self,
            pending: BTreeMap::new(),
        };
        let result = f(&mut txn)?;
        let pending = txn.pending;
        self.commit(pending)?;
        Ok(result)
    }

    fn commit(&self, pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>) -> EngineResult<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let records: Vec<Record> = pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Record::put(key, value),
                None => Record::tombstone(key),
            })
            .collect();

        let batch_len: usize = records.iter().map(Record::encoded_len).sum();
        let mut required = self.data.size() + batch_len as u64;
        if required > self.map_size && live_bytes(&self.index.read()) < self.data.size() {
            self.compact()?;
            required = self.data.size() + batch_len as u64;
        }
        if required > self.map_size {
            return Err(EngineError::MapFull {
                required,
                capacity: self.map_size,
            });
        }

        let mut buf = Vec::with_capacity(batch_len);
        let mut locations = Vec::with_capacity(records.len());
        for record in &records {
            locations.push((buf.len() as u64, record.encoded_len()));
            record.encode_into(&mut buf);
        }

        let base = self.data.append(&buf)?;
        if let Err(err) = self.data.sync() {
            // Unsynced records must not reappear on reopen.
            if let Err(trim) = self.data.truncate(base) {
                warn!(path = %self.path.display(), base, error = %trim, "could not roll back unsynced commit");
            }
            return Err(err);
        }

        let mut index = self.index.write();
        for (record, (relative, len)) in records.into_iter().zip(locations) {
            if record.value.is_some() {
                index.insert(
                    record.key,
                    Location {
                        offset: base + relative,
                        len,
                    },
                );
            } else {
                index.remove(&record.key);
            }
        }

        debug!(bytes = batch_len, used = base + batch_len as u64, "committed write transaction");
        Ok(())
    }

    /// Rewrites the data file with only its live records.
    ///
    /// The compacted image is written and synced under a temporary name,
    /// then renamed over the data file, so either the old or the new file
    /// is in place at any time.
    fn compact(&self) -> EngineResult<()> {
        let mut index = self.index.write();

        let mut live: Vec<(Vec<u8>, Location)> =
            index.iter().map(|(key, loc)| (key.clone(), *loc)).collect();
        live.sort_by_key(|(_, loc)| loc.offset);

        let mut buf = Vec::with_capacity(live_bytes(&index) as usize);
        let mut compacted = HashMap::with_capacity(live.len());
        for (key, location) in live {
            let bytes = self.data.read_at(location.offset, location.len)?;
            compacted.insert(
                key,
                Location {
                    offset: buf.len() as u64,
                    len: location.len,
                },
            );
            buf.extend_from_slice(&bytes);
        }

        let before = self.data.size();
        let compact_path = self.path.join(COMPACT_FILE);
        {
            let mut file = File::create(&compact_path)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        fs::rename(&compact_path, self.data.path())?;
        self.data.reopen()?;
        *index = compacted;

        info!(
            path = %self.path.display(),
            before,
            after = buf.len(),
            entries = index.len(),
            "compacted environment"
        );
        Ok(())
    }

    fn read_record(&self, location: Location) -> EngineResult<Record> {
        let data = self.data.read_at(location.offset, location.len)?;
        Record::decode(&data, location.offset)
    }

    /// Scans the data file and rebuilds the index.
    ///
    /// A damaged final record is treated as a torn write and truncated
    /// away (skipped when read-only). Damage anywhere else is an error.
    fn rebuild_index(&self) -> EngineResult<()> {
        let size = self.data.size();
        let mut index = HashMap::new();
        let mut offset = 0u64;

        while offset < size {
            let remaining = size - offset;
            if remaining < (HEADER_SIZE + CRC_SIZE) as u64 {
                self.truncate_tail(offset, "partial record header")?;
                break;
            }

            let len_bytes = self.data.read_at(offset, 4)?;
            let record_len = record::read_u32(&len_bytes) as u64;
            if record_len < (HEADER_SIZE + CRC_SIZE) as u64 {
                return Err(EngineError::corrupted(offset, "record length below minimum"));
            }
            if record_len > remaining {
                self.truncate_tail(offset, "record extends past end of file")?;
                break;
            }

            let data = self.data.read_at(offset, record_len as usize)?;
            let record = match Record::decode(&data, offset) {
                Ok(record) => record,
                Err(err) if offset + record_len == size => {
                    self.truncate_tail(offset, &err.to_string())?;
                    break;
                }
                Err(err) => return Err(err),
            };

            if record.value.is_some() {
                index.insert(
                    record.key,
                    Location {
                        offset,
                        len: record_len as usize,
                    },
                );
            } else {
                index.remove(&record.key);
            }
            offset += record_len;
        }

        *self.index.write() = index;
        Ok(())
    }

    fn truncate_tail(&self, offset: u64, reason: &str) -> EngineResult<()> {
        if self.read_only {
            warn!(
                path = %self.data.path().display(),
                offset,
                reason,
                "skipping damaged tail of read-only data file"
            );
            return Ok(());
        }
        warn!(
            path = %self.data.path().display(),
            offset,
            reason,
            "truncating damaged tail of data file"
        );
        self.data.truncate(offset)
    }
}

fn live_bytes(index: &HashMap<Vec<u8>, Location>) -> u64 {
    index.values().map(|loc| loc.len as u64).sum()
}

/// Staged changes of an open write transaction.
///
/// Reads through the transaction observe its own staged writes.
#[derive(Debug)]
pub struct WriteTxn<'env> {
    env: &'env Environment,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteTxn<'_> {
    /// Reads `key`, observing writes staged in this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the committed record cannot be read.
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.env.get(key),
        }
    }

    /// Checks presence, observing writes staged in this transaction.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        match self.pending.get(key) {
            Some(staged) => staged.is_some(),
            None => self.env.contains(key),
        }
    }

    /// Stages `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::KeyExists`] if `flags.no_overwrite` is set and
    /// the key is present.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>, flags: PutFlags) -> EngineResult<()> {
        if flags.no_overwrite && self.contains(key) {
            return Err(EngineError::KeyExists);
        }
        self.pending.insert(key.to_vec(), Some(value));
        Ok(())
    }

    /// Stages removal of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the key is absent.
    pub fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        if !self.contains(key) {
            return Err(EngineError::NotFound);
        }
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::file::Faults;
    use super::*;
    use tempfile::tempdir;

    fn options(map_size: u64) -> EnvOptions {
        EnvOptions {
            map_size,
            ..EnvOptions::default()
        }
    }

    fn read_only() -> EnvOptions {
        EnvOptions {
            read_only: true,
            ..EnvOptions::default()
        }
    }

    #[test]
    fn put_get_delete() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
            .unwrap();
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(env.contains(b"a"));

        env.write(|txn| txn.delete(b"a")).unwrap();
        assert_eq!(env.get(b"a").unwrap(), None);
        assert!(!env.contains(b"a"));
    }

    #[test]
    fn no_overwrite_rejects_existing_key() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        let flags = PutFlags { no_overwrite: true };

        env.write(|txn| txn.put(b"a", b"1".to_vec(), flags)).unwrap();
        let result = env.write(|txn| txn.put(b"a", b"2".to_vec(), flags));
        assert!(matches!(result, Err(EngineError::KeyExists)));
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn delete_missing_key_fails() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert!(matches!(
            env.write(|txn| txn.delete(b"missing")),
            Err(EngineError::NotFound)
        ));
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        let result = env.write(|txn| {
            txn.put(b"a", b"1".to_vec(), PutFlags::default())?;
            txn.delete(b"missing")
        });
        assert!(result.is_err());
        assert!(!env.contains(b"a"));
        assert_eq!(env.stats().used_bytes, 0);
    }

    #[test]
    fn txn_reads_its_own_writes() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        env.write(|txn| {
            txn.put(b"a", b"1".to_vec(), PutFlags::default())?;
            assert_eq!(txn.get(b"a")?, Some(b"1".to_vec()));
            txn.delete(b"a")?;
            assert!(!txn.contains(b"a"));
            Ok(())
        })
        .unwrap();
        assert!(!env.contains(b"a"));
    }

    #[test]
    fn exceeding_capacity_is_map_full() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), options(32 * 1024)).unwrap();

        let result = env.write(|txn| txn.put(b"big", vec![0u8; 40_000], PutFlags::default()));
        match result {
            Err(EngineError::MapFull { required, capacity }) => {
                assert_eq!(capacity, 32 * 1024);
                assert!(required > capacity);
            }
            other => panic!("expected MapFull, got {other:?}"),
        }
        assert_eq!(env.stats().used_bytes, 0);
    }

    #[test]
    fn content_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| {
                txn.put(b"a", b"1".to_vec(), PutFlags::default())?;
                txn.put(b"b", b"2".to_vec(), PutFlags::default())
            })
            .unwrap();
            env.write(|txn| txn.delete(b"b")).unwrap();
        }

        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(!env.contains(b"b"));
        assert_eq!(env.stats().entries, 1);
    }

    #[test]
    fn recreate_discards_content() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
                .unwrap();
        }

        let env = Environment::open(
            dir.path(),
            EnvOptions {
                recreate_if_exists: true,
                ..EnvOptions::default()
            },
        )
        .unwrap();
        assert!(!env.contains(b"a"));
        assert_eq!(env.stats().used_bytes, 0);
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert!(matches!(
            Environment::open(dir.path(), EnvOptions::default()),
            Err(EngineError::Locked { .. })
        ));
    }

    #[test]
    fn torn_tail_is_truncated_on_open() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
                .unwrap();
        }
        let data_path = dir.path().join(DATA_FILE);
        let good_len = fs::metadata(&data_path).unwrap().len();
        {
            let mut file = OpenOptions::new().append(true).open(&data_path).unwrap();
            std::io::Write::write_all(&mut file, &[40, 0, 0, 0, 0, 1]).unwrap();
        }

        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(env.stats().used_bytes, good_len);
    }

    #[test]
    fn reopen_with_smaller_capacity_fails() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", vec![7u8; 1000], PutFlags::default()))
                .unwrap();
        }
        assert!(matches!(
            Environment::open(dir.path(), options(100)),
            Err(EngineError::InvalidOptions(_))
        ));
    }

    #[test]
    fn repeated_updates_are_charged_on_live_data() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), options(32 * 1024)).unwrap();

        for round in 0..50u8 {
            env.write(|txn| txn.put(b"k", vec![round; 4096], PutFlags::default()))
                .unwrap();
        }

        assert_eq!(env.get(b"k").unwrap(), Some(vec![49u8; 4096]));
        let stats = env.stats();
        assert!(stats.used_bytes <= 32 * 1024);
        assert_eq!(stats.entries, 1);
        assert!(stats.live_bytes > 4096);
    }

    #[test]
    fn removal_makes_room_for_new_data() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), options(32 * 1024)).unwrap();

        for key in [b"a", b"b", b"c", b"d", b"e", b"f"] {
            env.write(|txn| txn.put(key, vec![1u8; 4096], PutFlags::default()))
                .unwrap();
        }
        assert!(matches!(
            env.write(|txn| txn.put(b"big", vec![2u8; 12_000], PutFlags::default())),
            Err(EngineError::MapFull { .. })
        ));

        env.write(|txn| {
            for key in [b"a", b"b", b"c", b"d", b"e", b"f"] {
                txn.delete(key)?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(env.stats().live_bytes, 0);

        env.write(|txn| txn.put(b"big", vec![2u8; 12_000], PutFlags::default()))
            .unwrap();
        assert_eq!(env.stats().used_bytes, env.stats().live_bytes);
    }

    #[test]
    fn compaction_keeps_every_live_key() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), options(16 * 1024)).unwrap();
            env.write(|txn| txn.put(b"stable", b"kept".to_vec(), PutFlags::default()))
                .unwrap();
            for round in 0..20u8 {
                env.write(|txn| txn.put(b"churn", vec![round; 2048], PutFlags::default()))
                    .unwrap();
            }
            assert!(!dir.path().join(COMPACT_FILE).exists());
        }

        let env = Environment::open(dir.path(), options(16 * 1024)).unwrap();
        assert_eq!(env.get(b"stable").unwrap(), Some(b"kept".to_vec()));
        assert_eq!(env.get(b"churn").unwrap(), Some(vec![19u8; 2048]));
        assert_eq!(env.stats().entries, 2);
    }

    #[test]
    fn open_compacts_history_that_exceeds_smaller_capacity() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            for round in 0..10u8 {
                env.write(|txn| txn.put(b"a", vec![round; 1000], PutFlags::default()))
                    .unwrap();
            }
            assert!(env.stats().used_bytes > 4096);
        }

        let env = Environment::open(dir.path(), options(4096)).unwrap();
        assert_eq!(env.get(b"a").unwrap(), Some(vec![9u8; 1000]));
        assert!(env.stats().used_bytes <= 4096);
    }

    #[test]
    fn failed_sync_rolls_back_commit() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
                .unwrap();
            let used = env.stats().used_bytes;

            env.data.inject(Faults {
                short_write: None,
                sync: true,
            });
            let result = env.write(|txn| txn.put(b"b", b"2".to_vec(), PutFlags::default()));
            assert!(matches!(result, Err(EngineError::Io(_))));
            assert!(!env.contains(b"b"));
            assert_eq!(env.stats().used_bytes, used);

            env.write(|txn| txn.put(b"c", b"3".to_vec(), PutFlags::default()))
                .unwrap();
        }

        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert!(!env.contains(b"b"));
        assert_eq!(env.get(b"c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn short_write_leaves_environment_usable() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
                .unwrap();
            let used = env.stats().used_bytes;

            env.data.inject(Faults {
                short_write: Some(5),
                sync: false,
            });
            assert!(env
                .write(|txn| txn.put(b"b", vec![2u8; 100], PutFlags::default()))
                .is_err());
            assert_eq!(env.stats().used_bytes, used);
            assert_eq!(fs::metadata(dir.path().join(DATA_FILE)).unwrap().len(), used);

            env.write(|txn| txn.put(b"c", b"3".to_vec(), PutFlags::default()))
                .unwrap();
            assert_eq!(env.get(b"c").unwrap(), Some(b"3".to_vec()));
        }

        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(!env.contains(b"b"));
        assert_eq!(env.get(b"c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn read_only_open_of_missing_environment_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent");

        assert!(matches!(
            Environment::open(&path, read_only()),
            Err(EngineError::MissingEnvironment { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn read_only_open_skips_torn_tail_without_truncating() {
        let dir = tempdir().unwrap();
        {
            let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default()))
                .unwrap();
        }
        let data_path = dir.path().join(DATA_FILE);
        {
            let mut file = OpenOptions::new().append(true).open(&data_path).unwrap();
            std::io::Write::write_all(&mut file, &[40, 0, 0, 0, 0, 1]).unwrap();
        }
        let damaged_len = fs::metadata(&data_path).unwrap().len();

        let env = Environment::open(dir.path(), read_only()).unwrap();
        assert!(env.is_read_only());
        assert_eq!(env.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(fs::metadata(&data_path).unwrap().len(), damaged_len);
    }

    #[test]
    fn read_only_environment_rejects_writes() {
        let dir = tempdir().unwrap();
        drop(Environment::open(dir.path(), EnvOptions::default()).unwrap());

        let env = Environment::open(dir.path(), read_only()).unwrap();
        assert!(matches!(
            env.write(|txn| txn.put(b"a", b"1".to_vec(), PutFlags::default())),
            Err(EngineError::ReadOnly)
        ));
    }

    #[test]
    fn read_only_handles_share_the_lock() {
        let dir = tempdir().unwrap();
        drop(Environment::open(dir.path(), EnvOptions::default()).unwrap());

        let _first = Environment::open(dir.path(), read_only()).unwrap();
        let _second = Environment::open(dir.path(), read_only()).unwrap();
        assert!(matches!(
            Environment::open(dir.path(), EnvOptions::default()),
            Err(EngineError::Locked { .. })
        ));
    }

    #[test]
    fn read_only_cannot_recreate() {
        let dir = tempdir().unwrap();
        let options = EnvOptions {
            recreate_if_exists: true,
            ..read_only()
        };
        assert!(matches!(
            Environment::open(dir.path(), options),
            Err(EngineError::InvalidOptions(_))
        ));
    }
}
