//! Append-only data file underneath an environment.

use super::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file that only grows, except for explicit truncation.
///
/// The tracked `size` is the end of the last successful append. Appends
/// always write at that offset, and a failed append trims the file back to
/// it, so bytes past `size` never become addressable.
///
/// # Durability
///
/// `append` leaves data in OS buffers; `sync` calls `File::sync_all()`.
///
/// # Thread Safety
///
/// Reads and appends may be issued from several threads. The environment
/// above it guarantees a single appender at a time.
#[derive(Debug)]
pub(crate) struct DataFile {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
    #[cfg(test)]
    faults: RwLock<Faults>,
}

/// Failures injected by unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Faults {
    /// Write this many bytes of the next append, then fail it.
    pub(crate) short_write: Option<usize>,
    /// Fail the next sync.
    pub(crate) sync: bool,
}

impl DataFile {
    /// Opens or creates the file at `path`, keeping existing content.
    pub(crate) fn open(path: &Path) -> EngineResult<Self> {
        let file = Self::open_writable(path)?;
        Self::from_file(path, file)
    }

    /// Opens an existing file without write access.
    pub(crate) fn open_read_only(path: &Path) -> EngineResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Self::from_file(path, file)
    }

    fn open_writable(path: &Path) -> EngineResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    fn from_file(path: &Path, file: File) -> EngineResult<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
            #[cfg(test)]
            faults: RwLock::new(Faults::default()),
        })
    }

    /// Switches to the file now found at this path, e.g. after a rename.
    pub(crate) fn reopen(&self) -> EngineResult<()> {
        let reopened = Self::open_writable(&self.path)?;
        let len = reopened.metadata()?.len();

        let mut file = self.file.write();
        let mut size = self.size.write();
        *file = reopened;
        *size = len;
        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn size(&self) -> u64 {
        *self.size.read()
    }

    pub(crate) fn read_at(&self, offset: u64, len: usize) -> EngineResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if end > size {
            return Err(EngineError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Appends `data` at the tracked end and returns the offset it was
    /// written at.
    ///
    /// On failure the file is trimmed back to that offset.
    pub(crate) fn append(&self, data: &[u8]) -> EngineResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::Start(offset))?;
        if let Err(err) = self.write_all(&mut file, data) {
            if let Err(trim) = file.set_len(offset) {
                warn!(path = %self.path.display(), offset, error = %trim, "could not trim failed append");
            }
            return Err(err.into());
        }
        *size += data.len() as u64;

        Ok(offset)
    }

    #[cfg(not(test))]
    fn write_all(&self, file: &mut File, data: &[u8]) -> std::io::Result<()> {
        file.write_all(data)
    }

    #[cfg(test)]
    fn write_all(&self, file: &mut File, data: &[u8]) -> std::io::Result<()> {
        if let Some(written) = self.faults.write().short_write.take() {
            file.write_all(&data[..written.min(data.len())])?;
            return Err(std::io::Error::other("injected short write"));
        }
        file.write_all(data)
    }

    pub(crate) fn sync(&self) -> EngineResult<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.faults.write().sync) {
            return Err(std::io::Error::other("injected sync failure").into());
        }

        let mut file = self.file.write();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Cuts the file back to `new_size` bytes.
    pub(crate) fn truncate(&self, new_size: u64) -> EngineResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(EngineError::InvalidOptions(format!(
                "truncate to {new_size} would grow a {} byte file",
                *size
            )));
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, faults: Faults) {
        *self.faults.write() = faults;
    }
}
