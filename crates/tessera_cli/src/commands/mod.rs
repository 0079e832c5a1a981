//! CLI command implementations.

pub mod exists;
pub mod read;
pub mod remove;
pub mod stats;
pub mod write;

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CliError;
use tessera_storage::{
    AtomKey, EmbeddedConfig, KeyBuilder, KeyType, LibraryPath, OpenMode, Storage, StorageConfig,
};

/// Output format of reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Where the storage lives, from the global arguments.
#[derive(Debug, Clone)]
pub struct Target {
    /// Root directory of embedded environments.
    pub path: Option<PathBuf>,
    /// JSON configuration file.
    pub config: Option<PathBuf>,
    /// Dot-delimited library path.
    pub library: String,
}

impl Target {
    /// Resolves the storage configuration. `--config` wins over `--path`.
    pub fn storage_config(&self) -> Result<StorageConfig, Box<dyn std::error::Error>> {
        if let Some(file) = &self.config {
            let json = read_file(file)?;
            let json = String::from_utf8(json)?;
            return Ok(StorageConfig::from_json(&json)?);
        }
        let path = self.path.as_ref().ok_or(CliError::MissingStorage)?;
        Ok(StorageConfig::Embedded(EmbeddedConfig::new(path)))
    }

    /// Parses the library path.
    pub fn library_path(&self) -> Result<LibraryPath, Box<dyn std::error::Error>> {
        Ok(LibraryPath::from_delimited(&self.library, '.')?)
    }

    /// Opens the configured storage.
    pub fn open(&self, mode: OpenMode) -> Result<Box<dyn Storage>, Box<dyn std::error::Error>> {
        let config = self.storage_config()?;
        let library = self.library_path()?;
        debug!(backend = backend_name(&config), %library, ?mode, "opening storage");
        Ok(config.open(library, mode)?)
    }
}

/// Short name of the backend a configuration selects.
pub fn backend_name(config: &StorageConfig) -> &'static str {
    match config {
        StorageConfig::Embedded(_) => "embedded",
        StorageConfig::Memory(_) => "memory",
        StorageConfig::ObjectStore(_) => "object_store",
    }
}

/// Arguments identifying one key.
#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    /// Symbol
    #[arg(short, long)]
    pub symbol: String,

    /// Version id
    #[arg(long = "version-id", default_value = "0")]
    pub version_id: u64,

    /// Key type prefix (v, vref, d, i, sref, sl) or full name
    #[arg(short = 't', long, default_value = "v")]
    pub key_type: String,

    /// Creation timestamp
    #[arg(long)]
    pub creation_ts: Option<i64>,

    /// Content hash
    #[arg(long)]
    pub content_hash: Option<u64>,
}

impl KeyArgs {
    /// Builds the key.
    pub fn to_key(&self) -> Result<AtomKey, Box<dyn std::error::Error>> {
        let key_type = KeyType::from_name(&self.key_type).ok_or_else(|| {
            let known: Vec<_> = KeyType::ALL.iter().map(|t| t.prefix()).collect();
            CliError::UnknownKeyType(self.key_type.clone(), known.join(", "))
        })?;

        let mut builder = KeyBuilder::new(key_type)
            .version_id(self.version_id)
            .symbol(self.symbol.clone());
        if let Some(ts) = self.creation_ts {
            builder = builder.creation_ts(ts);
        }
        if let Some(hash) = self.content_hash {
            builder = builder.content_hash(hash);
        }
        Ok(builder.build()?)
    }
}

/// Serializable view of a key.
#[derive(Debug, Serialize)]
pub struct KeyView {
    /// Key type prefix.
    pub key_type: &'static str,
    /// Symbol.
    pub symbol: String,
    /// Version id.
    pub version_id: u64,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_ts: Option<i64>,
    /// Content hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<u64>,
}

impl From<&AtomKey> for KeyView {
    fn from(key: &AtomKey) -> Self {
        Self {
            key_type: key.key_type().prefix(),
            symbol: key.symbol().to_string(),
            version_id: key.version_id(),
            creation_ts: key.creation_ts(),
            content_hash: key.content_hash(),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::File {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|source| CliError::File {
        path: path.display().to_string(),
        source,
    })
}
