//! Composite keys addressing stored segments.

use std::fmt;
use thiserror::Error;

/// Errors produced while building or decoding a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A required builder field was never set.
    #[error("key is missing required field `{0}`")]
    MissingField(&'static str),

    /// The symbol is the empty string.
    #[error("key symbol must not be empty")]
    EmptySymbol,

    /// The key type code is not known.
    #[error("unknown key type code {0}")]
    UnknownKeyType(u8),

    /// The encoded key is truncated or malformed.
    #[error("malformed encoded key: {0}")]
    Malformed(String),
}

/// The kind of entity a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    /// A version of a symbol.
    Version,
    /// Pointer to the latest version of a symbol.
    VersionRef,
    /// A slice of table data.
    TableData,
    /// Index over the data keys of one version.
    TableIndex,
    /// A named snapshot.
    SnapshotRef,
    /// Cached list of symbols in a library.
    SymbolList,
}

impl KeyType {
    /// All key types, in code order.
    pub const ALL: [Self; 6] = [
        Self::Version,
        Self::VersionRef,
        Self::TableData,
        Self::TableIndex,
        Self::SnapshotRef,
        Self::SymbolList,
    ];

    /// Stable one-byte code used in encoded keys.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Version => 1,
            Self::VersionRef => 2,
            Self::TableData => 3,
            Self::TableIndex => 4,
            Self::SnapshotRef => 5,
            Self::SymbolList => 6,
        }
    }

    /// Looks up a key type by its code.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::UnknownKeyType`] for an unassigned code.
    pub fn from_code(code: u8) -> Result<Self, KeyError> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(KeyError::UnknownKeyType(code))
    }

    /// Short directory prefix used in object names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Version => "v",
            Self::VersionRef => "vref",
            Self::TableData => "d",
            Self::TableIndex => "i",
            Self::SnapshotRef => "sref",
            Self::SymbolList => "sl",
        }
    }

    /// Parses a key type from its object-name prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.prefix() == prefix)
    }

    /// Parses a key type from its name or its prefix, as used on the
    /// command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key_type) = Self::from_prefix(name) {
            return Some(key_type);
        }
        match name.to_ascii_lowercase().as_str() {
            "version" => Some(Self::Version),
            "version_ref" | "version-ref" => Some(Self::VersionRef),
            "table_data" | "table-data" => Some(Self::TableData),
            "table_index" | "table-index" => Some(Self::TableIndex),
            "snapshot_ref" | "snapshot-ref" => Some(Self::SnapshotRef),
            "symbol_list" | "symbol-list" => Some(Self::SymbolList),
            _ => None,
        }
    }
}

/// Key of a single stored segment.
///
/// Identity is the full tuple: two keys that differ only in their creation
/// timestamp address different segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomKey {
    key_type: KeyType,
    version_id: u64,
    symbol: String,
    creation_ts: Option<i64>,
    content_hash: Option<u64>,
}

impl AtomKey {
    const FLAG_TS: u8 = 0x01;
    const FLAG_HASH: u8 = 0x02;
    // type (1) + version (8) + flags (1) + ts (8) + hash (8) + symbol_len (4)
    const FIXED_LEN: usize = 30;

    /// Returns the key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the version id.
    #[must_use]
    pub const fn version_id(&self) -> u64 {
        self.version_id
    }

    /// Returns the symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the creation timestamp, if any.
    #[must_use]
    pub const fn creation_ts(&self) -> Option<i64> {
        self.creation_ts
    }

    /// Returns the content hash, if any.
    #[must_use]
    pub const fn content_hash(&self) -> Option<u64> {
        self.content_hash
    }

    /// Canonical binary form, used as the raw key in the embedded engine.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::FIXED_LEN + self.symbol.len());
        buf.push(self.key_type.code());
        buf.extend_from_slice(&self.version_id.to_le_bytes());

        let mut flags = 0u8;
        if self.creation_ts.is_some() {
            flags |= Self::FLAG_TS;
        }
        if self.content_hash.is_some() {
            flags |= Self::FLAG_HASH;
        }
        buf.push(flags);
        buf.extend_from_slice(&self.creation_ts.unwrap_or(0).to_le_bytes());
        buf.extend_from_slice(&self.content_hash.unwrap_or(0).to_le_bytes());

        buf.extend_from_slice(&(self.symbol.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.symbol.as_bytes());
        buf
    }

    /// Decodes a key produced by [`AtomKey::encode`].
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the bytes are truncated, carry an unknown
    /// key type, or the symbol is not UTF-8.
    pub fn decode(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() < Self::FIXED_LEN {
            return Err(KeyError::Malformed(format!(
                "expected at least {} bytes, got {}",
                Self::FIXED_LEN,
                bytes.len()
            )));
        }

        let key_type = KeyType::from_code(bytes[0])?;
        let version_id = u64::from_le_bytes(fixed(&bytes[1..9]));
        let flags = bytes[9];
        let ts = i64::from_le_bytes(fixed(&bytes[10..18]));
        let hash = u64::from_le_bytes(fixed(&bytes[18..26]));
        let symbol_len = u32::from_le_bytes(fixed(&bytes[26..30])) as usize;

        let symbol_bytes = &bytes[Self::FIXED_LEN..];
        if symbol_bytes.len() != symbol_len {
            return Err(KeyError::Malformed(format!(
                "symbol length {symbol_len} does not match {} remaining bytes",
                symbol_bytes.len()
            )));
        }
        let symbol = String::from_utf8(symbol_bytes.to_vec())
            .map_err(|e| KeyError::Malformed(e.to_string()))?;

        Ok(Self {
            key_type,
            version_id,
            symbol,
            creation_ts: (flags & Self::FLAG_TS != 0).then_some(ts),
            content_hash: (flags & Self::FLAG_HASH != 0).then_some(hash),
        })
    }

    /// Object name relative to a library prefix.
    ///
    /// Layout: `{type_prefix}/{symbol}*{version_id}*{creation_ts}*{content_hash}`,
    /// with absent optional fields left empty.
    #[must_use]
    pub fn object_name(&self) -> String {
        let ts = self.creation_ts.map(|t| t.to_string()).unwrap_or_default();
        let hash = self
            .content_hash
            .map(|h| format!("{h:016x}"))
            .unwrap_or_default();
        format!(
            "{}/{}*{}*{}*{}",
            self.key_type.prefix(),
            self.symbol,
            self.version_id,
            ts,
            hash
        )
    }
}

fn fixed<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}:{}:{}",
            self.key_type, self.symbol, self.version_id
        )?;
        if let Some(ts) = self.creation_ts {
            write!(f, "@{ts}")?;
        }
        Ok(())
    }
}

/// Builder for [`AtomKey`].
///
/// ```rust
/// use tessera_storage::{KeyBuilder, KeyType};
///
/// let key = KeyBuilder::new(KeyType::Version)
///     .version_id(0)
///     .symbol("sym")
///     .build()
///     .unwrap();
/// assert_eq!(key.symbol(), "sym");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct KeyBuilder {
    key_type: KeyType,
    version_id: Option<u64>,
    symbol: Option<String>,
    creation_ts: Option<i64>,
    content_hash: Option<u64>,
}

impl KeyBuilder {
    /// Starts a key of the given type.
    pub const fn new(key_type: KeyType) -> Self {
        Self {
            key_type,
            version_id: None,
            symbol: None,
            creation_ts: None,
            content_hash: None,
        }
    }

    /// Sets the version id.
    pub const fn version_id(mut self, id: u64) -> Self {
        self.version_id = Some(id);
        self
    }

    /// Sets the symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the creation timestamp.
    pub const fn creation_ts(mut self, ts: i64) -> Self {
        self.creation_ts = Some(ts);
        self
    }

    /// Sets the content hash.
    pub const fn content_hash(mut self, hash: u64) -> Self {
        self.content_hash = Some(hash);
        self
    }

    /// Builds the key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MissingField`] if the version id or symbol was not
    /// set, and [`KeyError::EmptySymbol`] for an empty symbol.
    pub fn build(self) -> Result<AtomKey, KeyError> {
        let version_id = self.version_id.ok_or(KeyError::MissingField("version_id"))?;
        let symbol = self.symbol.ok_or(KeyError::MissingField("symbol"))?;
        if symbol.is_empty() {
            return Err(KeyError::EmptySymbol);
        }
        Ok(AtomKey {
            key_type: self.key_type,
            version_id,
            symbol,
            creation_ts: self.creation_ts,
            content_hash: self.content_hash,
        })
    }
}
