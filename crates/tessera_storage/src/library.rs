//! Library path: the namespace a storage instance is opened under.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StorageError, StorageResult};

const SEPARATORS: [char; 3] = ['.', '/', '\\'];

/// Ordered, immutable sequence of namespace parts.
///
/// Two paths are equal when their parts are equal in order. A path is
/// never empty, and no part is empty or contains a separator character
/// (`.`, `/`, `\`), so every delimited form maps back to one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LibraryPath {
    parts: Vec<String>,
}

impl LibraryPath {
    /// Creates a path from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if there are no parts, or any part is
    /// empty or contains a separator.
    pub fn new<I, S>(parts: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() {
            return Err(StorageError::config("library path has no parts"));
        }
        if parts.iter().any(String::is_empty) {
            return Err(StorageError::config(format!(
                "library path {parts:?} contains an empty part"
            )));
        }
        if let Some(part) = parts.iter().find(|p| p.contains(SEPARATORS)) {
            return Err(StorageError::config(format!(
                "library path part '{part}' contains a separator"
            )));
        }
        Ok(Self { parts })
    }

    /// Splits a delimited library name, e.g. `"team.prices"` with `'.'`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the name yields an empty part.
    pub fn from_delimited(name: &str, delimiter: char) -> StorageResult<Self> {
        Self::new(name.split(delimiter))
    }

    /// Returns the parts in order.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Joins the parts with `delimiter`.
    #[must_use]
    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            out.push_str(part);
        }
        out
    }
}

impl fmt::Display for LibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited('.'))
    }
}

impl TryFrom<Vec<String>> for LibraryPath {
    type Error = StorageError;

    fn try_from(parts: Vec<String>) -> StorageResult<Self> {
        Self::new(parts)
    }
}

impl From<LibraryPath> for Vec<String> {
    fn from(path: LibraryPath) -> Self {
        path.parts
    }
}
