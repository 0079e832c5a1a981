//! Exists command implementation.

use serde::Serialize;

use super::{KeyArgs, KeyView, OutputFormat, Target};
use tessera_storage::OpenMode;

#[derive(Debug, Serialize)]
struct ExistsResult {
    key: KeyView,
    exists: bool,
}

/// Runs the exists command.
pub fn run(
    target: &Target,
    key: &KeyArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = key.to_key()?;
    let storage = target.open(OpenMode::Read)?;
    let exists = storage.key_exists(&key)?;

    match format {
        OutputFormat::Json => {
            let result = ExistsResult {
                key: KeyView::from(&key),
                exists,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => println!("{exists}"),
    }
    Ok(())
}
