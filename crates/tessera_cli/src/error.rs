//! CLI error types.

use thiserror::Error;

/// Errors raised by the CLI itself, before or after a storage call.
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither `--path` nor `--config` was given.
    #[error("a storage is required: pass --path <dir> or --config <file.json>")]
    MissingStorage,

    /// `--key-type` named no known key type.
    #[error("unknown key type '{0}' (expected one of: {1})")]
    UnknownKeyType(String, String),

    /// `write` received no payload.
    #[error("a payload is required: pass --data <text> or --input <file>")]
    MissingPayload,

    /// The command only works on embedded environments.
    #[error("{command} requires an embedded storage, the configuration selects {backend}")]
    NotEmbedded {
        /// The command.
        command: &'static str,
        /// The configured backend.
        backend: &'static str,
    },

    /// A CLI file could not be read or written.
    #[error("{path}: {source}")]
    File {
        /// The file.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
