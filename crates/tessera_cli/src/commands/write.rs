//! Write command implementation.

use std::path::Path;
use tracing::info;

use super::{read_file, KeyArgs, Target};
use crate::error::CliError;
use tessera_storage::{KeySegmentPair, OpenMode, Segment, UpdateOpts};

/// How the segment is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New key only.
    Write,
    /// Replace an existing key, or create it when `upsert` is set.
    Update {
        /// Create the key if absent.
        upsert: bool,
    },
}

impl WriteMode {
    /// Maps the `--update`/`--upsert` flags.
    pub fn from_flags(update: bool, upsert: bool) -> Self {
        if update {
            Self::Update { upsert }
        } else {
            Self::Write
        }
    }
}

/// Resolves the payload from `--data` or `--input`.
pub fn load_payload(data: Option<String>, input: Option<&Path>) -> Result<Vec<u8>, CliError> {
    match (data, input) {
        (Some(data), _) => Ok(data.into_bytes()),
        (None, Some(path)) => read_file(path),
        (None, None) => Err(CliError::MissingPayload),
    }
}

/// Runs the write command.
pub fn run(
    target: &Target,
    key: &KeyArgs,
    payload: Vec<u8>,
    (start_ts, end_ts): (i64, i64),
    mode: WriteMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = key.to_key()?;
    let storage = target.open(OpenMode::Write)?;

    let size = payload.len();
    let mut segment = Segment::with_buffer(payload);
    let header = segment.header_mut();
    header.start_ts = start_ts;
    header.end_ts = end_ts;
    let pair = KeySegmentPair::with_segment(key.clone(), segment);

    match mode {
        WriteMode::Write => storage.write(pair)?,
        WriteMode::Update { upsert } => storage.update(pair, UpdateOpts { upsert })?,
    }

    info!(%key, bytes = size, backend = storage.name(), "segment stored");
    println!("Stored {key} ({size} bytes)");
    Ok(())
}
