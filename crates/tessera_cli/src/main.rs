//! Tessera CLI
//!
//! Command-line tools for Tessera segment storage.
//!
//! # Commands
//!
//! - `write` - Store a segment under a key
//! - `read` - Print or export a stored segment
//! - `remove` - Delete a key
//! - `exists` - Check whether a key is stored
//! - `stats` - Display embedded environment usage

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::{KeyArgs, OutputFormat, Target};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tessera command-line storage tools.
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of embedded environments
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// JSON storage configuration file (overrides --path)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Library path, dot-delimited
    #[arg(global = true, short, long, default_value = "default")]
    library: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a segment under a key
    Write {
        #[command(flatten)]
        key: KeyArgs,

        /// Payload given inline
        #[arg(short, long, conflicts_with = "input")]
        data: Option<String>,

        /// Read the payload from a file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Segment start timestamp
        #[arg(long, default_value = "0")]
        start_ts: i64,

        /// Segment end timestamp
        #[arg(long, default_value = "0")]
        end_ts: i64,

        /// Replace an existing key instead of writing a new one
        #[arg(long)]
        update: bool,

        /// With --update, create the key if it is missing
        #[arg(long, requires = "update")]
        upsert: bool,
    },

    /// Print or export a stored segment
    Read {
        #[command(flatten)]
        key: KeyArgs,

        /// Write the raw payload to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete a key
    Remove {
        #[command(flatten)]
        key: KeyArgs,

        /// Succeed even if the key is missing
        #[arg(long)]
        ignore_missing: bool,
    },

    /// Check whether a key is stored
    Exists {
        #[command(flatten)]
        key: KeyArgs,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Display embedded environment usage
    Stats {
        /// List every stored key
        #[arg(short, long)]
        keys: bool,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let target = Target {
        path: cli.path,
        config: cli.config,
        library: cli.library,
    };

    match cli.command {
        Commands::Write {
            key,
            data,
            input,
            start_ts,
            end_ts,
            update,
            upsert,
        } => {
            let payload = commands::write::load_payload(data, input.as_deref())?;
            commands::write::run(
                &target,
                &key,
                payload,
                (start_ts, end_ts),
                commands::write::WriteMode::from_flags(update, upsert),
            )?;
        }
        Commands::Read {
            key,
            output,
            format,
        } => {
            commands::read::run(&target, &key, output.as_deref(), format)?;
        }
        Commands::Remove {
            key,
            ignore_missing,
        } => {
            commands::remove::run(&target, &key, ignore_missing)?;
        }
        Commands::Exists { key, format } => {
            commands::exists::run(&target, &key, format)?;
        }
        Commands::Stats { keys, format } => {
            commands::stats::run(&target, keys, format)?;
        }
        Commands::Version => {
            println!("Tessera CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tessera Storage v{}", tessera_storage::VERSION);
        }
    }

    Ok(())
}
