//! Read command implementation.

use serde::Serialize;
use std::path::Path;

use super::{write_file, KeyArgs, KeyView, OutputFormat, Target};
use tessera_storage::{OpenMode, ReadKeyOpts, Segment};

/// A segment as reported by the read command.
#[derive(Debug, Serialize)]
pub struct ReadResult {
    /// The key read.
    pub key: KeyView,
    /// Header start timestamp.
    pub start_ts: i64,
    /// Header end timestamp.
    pub end_ts: i64,
    /// Header encoding version.
    pub encoding_version: u16,
    /// Payload size in bytes.
    pub size: usize,
    /// Payload as text, when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ReadResult {
    fn new(key: KeyView, segment: &Segment) -> Self {
        let header = segment.header();
        Self {
            key,
            start_ts: header.start_ts,
            end_ts: header.end_ts,
            encoding_version: header.encoding_version,
            size: segment.buffer().len(),
            text: std::str::from_utf8(segment.buffer()).ok().map(str::to_string),
        }
    }
}

/// Runs the read command.
pub fn run(
    target: &Target,
    key: &KeyArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = key.to_key()?;
    let storage = target.open(OpenMode::Read)?;
    let segment = storage.read(
        &key,
        ReadKeyOpts {
            dont_warn_about_missing_key: true,
        },
    )?;

    if let Some(path) = output {
        write_file(path, segment.buffer())?;
    }

    let result = ReadResult::new(KeyView::from(&key), &segment);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &ReadResult) {
    println!("Segment {}:{}", result.key.key_type, result.key.symbol);
    println!("  Version:    {}", result.key.version_id);
    println!("  Time range: {}..{}", result.start_ts, result.end_ts);
    println!("  Encoding:   {}", result.encoding_version);
    println!("  Size:       {} bytes", result.size);
    if let Some(text) = &result.text {
        println!("  Payload:    {text}");
    }
}
