//! Remove command implementation.

use tracing::info;

use super::{KeyArgs, Target};
use tessera_storage::{OpenMode, RemoveOpts};

/// Runs the remove command.
pub fn run(
    target: &Target,
    key: &KeyArgs,
    ignore_missing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = key.to_key()?;
    let storage = target.open(OpenMode::Write)?;
    storage.remove(
        &key,
        RemoveOpts {
            ignores_missing_key: ignore_missing,
        },
    )?;

    info!(%key, backend = storage.name(), "key removed");
    println!("Removed {key}");
    Ok(())
}
