//! Sona CLI
//!
//! Operator tools for a file-backed Sona broker store.
//!
//! # Commands
//!
//! - `get` - Show the committed configuration of a service
//! - `list` - List every known service and its version
//! - `add` - Create a service configuration
//! - `update` - Replace a configuration if its version still matches
//! - `delete` - Soft-delete a configuration if its version still matches

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sona configuration broker tools.
#[derive(Parser)]
#[command(name = "sona")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the broker's document file
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the committed configuration of a service
    Get {
        /// Service key
        service_key: String,
    },

    /// List every known service, soft-deleted ones included
    List,

    /// Create a service configuration at version 0
    Add {
        /// Service key
        service_key: String,

        /// Configuration entries as key=value
        entries: Vec<String>,
    },

    /// Replace a configuration if its version still matches
    Update {
        /// Service key
        service_key: String,

        /// Version the caller last read
        version: u64,

        /// Configuration entries as key=value
        entries: Vec<String>,
    },

    /// Soft-delete a configuration if its version still matches
    Delete {
        /// Service key
        service_key: String,

        /// Version the caller last read
        version: u64,
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
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let format = commands::OutputFormat::parse(&cli.format)?;

    match cli.command {
        Commands::Get { service_key } => {
            let path = cli.data.ok_or("Data file required for get")?;
            commands::get::run(&path, &service_key, format)?;
        }
        Commands::List => {
            let path = cli.data.ok_or("Data file required for list")?;
            commands::list::run(&path, format)?;
        }
        Commands::Add {
            service_key,
            entries,
        } => {
            let path = cli.data.ok_or("Data file required for add")?;
            commands::add::run(&path, &service_key, &entries, format)?;
        }
        Commands::Update {
            service_key,
            version,
            entries,
        } => {
            let path = cli.data.ok_or("Data file required for update")?;
            commands::update::run(&path, &service_key, version, &entries, format)?;
        }
        Commands::Delete {
            service_key,
            version,
        } => {
            let path = cli.data.ok_or("Data file required for delete")?;
            commands::delete::run(&path, &service_key, version, format)?;
        }
        Commands::Version => {
            println!("Sona CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
