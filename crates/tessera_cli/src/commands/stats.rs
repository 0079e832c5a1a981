//! Stats command implementation.

use serde::Serialize;

use super::{backend_name, KeyView, OutputFormat, Target};
use crate::error::CliError;
use tessera_storage::{EmbeddedStorage, EnvStats, OpenMode, StorageConfig};

/// Environment usage as reported by the stats command.
#[derive(Debug, Serialize)]
pub struct StatsResult {
    /// Environment directory.
    pub path: String,
    /// Library path.
    pub library: String,
    /// Capacity in bytes.
    pub map_size: u64,
    /// Bytes used, including superseded records.
    pub used_bytes: u64,
    /// Bytes held by live records.
    pub live_bytes: u64,
    /// Used share of the capacity, in percent.
    pub used_percent: f64,
    /// Number of live keys.
    pub entries: usize,
    /// Stored keys (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<KeyView>>,
}

impl StatsResult {
    fn new(library: String, stats: &EnvStats) -> Self {
        let used_percent = if stats.map_size == 0 {
            0.0
        } else {
            stats.used_bytes as f64 * 100.0 / stats.map_size as f64
        };
        Self {
            path: stats.path.display().to_string(),
            library,
            map_size: stats.map_size,
            used_bytes: stats.used_bytes,
            live_bytes: stats.live_bytes,
            used_percent,
            entries: stats.entries,
            keys: None,
        }
    }
}

/// Runs the stats command.
pub fn run(
    target: &Target,
    list_keys: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match target.storage_config()? {
        StorageConfig::Embedded(config) => config,
        other => {
            return Err(CliError::NotEmbedded {
                command: "stats",
                backend: backend_name(&other),
            }
            .into())
        }
    };

    let library = target.library_path()?;
    let storage = EmbeddedStorage::open(library.clone(), OpenMode::Read, &config)?;
    let mut result = StatsResult::new(library.to_string(), &storage.stats());
    if list_keys {
        result.keys = Some(storage.keys()?.iter().map(KeyView::from).collect());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &StatsResult) {
    println!("Environment: {}", result.path);
    println!("Library:     {}", result.library);
    println!();
    println!("Capacity:    {} bytes", result.map_size);
    println!(
        "Used:        {} bytes ({:.1}%)",
        result.used_bytes, result.used_percent
    );
    println!("Live:        {} bytes", result.live_bytes);
    println!("Entries:     {}", result.entries);

    if let Some(keys) = &result.keys {
        println!();
        println!("Keys:");
        for key in keys {
            println!("  {}/{} v{}", key.key_type, key.symbol, key.version_id);
        }
    }
}
