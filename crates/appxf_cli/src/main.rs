//! APPXF CLI
//!
//! Command-line tools for directories used as APPXF storage locations.
//!
//! # Commands
//!
//! - `sync` - Synchronize items between two directories
//! - `status` - Show what `sync` would do
//! - `inspect` - Print an item's metadata and sync record as JSON
//! - `put` / `get` - Store or load an item's content as raw bytes

mod commands;

use appxf_sync::SyncConfig;
use clap::{Parser, Subcommand};
use commands::location::LocationOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// APPXF storage synchronization tools.
#[derive(Parser)]
#[command(name = "appxf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// User recorded in sync records
    #[arg(global = true, short, long, default_value = "")]
    user: String,

    /// Base64 encoded 32 byte key; items are encrypted when set
    #[arg(global = true, long, env = "APPXF_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize items between two directories
    Sync {
        /// Directory of location A
        a: PathBuf,

        /// Directory of location B
        b: PathBuf,

        /// Item to sync (repeatable); all items of A and B if omitted
        #[arg(short, long = "item")]
        items: Vec<String>,

        /// Only propagate changes from A to B
        #[arg(long)]
        one_way: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,

        /// Skip failing items instead of stopping at the first one
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Show what sync would do
    Status {
        /// Directory of location A
        a: PathBuf,

        /// Directory of location B
        b: PathBuf,

        /// Item to check (repeatable); all items of A and B if omitted
        #[arg(short, long = "item")]
        items: Vec<String>,

        /// Only consider changes from A to B
        #[arg(long)]
        one_way: bool,
    },

    /// Print an item's metadata and sync record as JSON
    Inspect {
        /// Location directory
        dir: PathBuf,

        /// Item name
        item: String,
    },

    /// Store a file's content as an item
    Put {
        /// Location directory
        dir: PathBuf,

        /// Item name
        item: String,

        /// File to read
        file: PathBuf,
    },

    /// Write an item's content to stdout or a file
    Get {
        /// Location directory
        dir: PathBuf,

        /// Item name
        item: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = LocationOptions {
        user: cli.user,
        key: cli.key,
    };

    match cli.command {
        Commands::Sync {
            a,
            b,
            items,
            one_way,
            dry_run,
            keep_going,
        } => {
            let config = SyncConfig::new()
                .with_only_a_to_b(one_way)
                .with_dry_run(dry_run);
            commands::sync::run(&a, &b, &items, config, keep_going, &options)?;
        }
        Commands::Status {
            a,
            b,
            items,
            one_way,
        } => {
            let config = SyncConfig::new().with_only_a_to_b(one_way);
            commands::status::run(&a, &b, &items, config, &options)?;
        }
        Commands::Inspect { dir, item } => {
            commands::inspect::run(&dir, &item, &options)?;
        }
        Commands::Put { dir, item, file } => {
            commands::put::run(&dir, &item, &file, &options)?;
        }
        Commands::Get { dir, item, output } => {
            commands::get::run(&dir, &item, output.as_deref(), &options)?;
        }
    }

    Ok(())
}
