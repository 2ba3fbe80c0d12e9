//! QueueSync CLI
//!
//! Command-line tools for inspecting recorded queue traffic.
//!
//! # Commands
//!
//! - `replay` - Apply an event log to a snapshot and print the final queue
//! - `validate` - Check a snapshot for queue invariant violations
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// QueueSync command-line tools.
#[derive(Parser)]
#[command(name = "queuesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an event log to a snapshot and print the final queue
    Replay {
        /// Snapshot file (JSON array of vehicles)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Event log (one JSON event per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check a snapshot for queue invariant violations
    Validate {
        /// Snapshot file (JSON array of vehicles)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Expected route (defaults to the first vehicle's route)
        #[arg(short, long)]
        route: Option<String>,
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

    match cli.command {
        Commands::Replay {
            snapshot,
            events,
            format,
        } => {
            commands::replay::run(&snapshot, &events, &format)?;
        }
        Commands::Validate { snapshot, route } => {
            commands::validate::run(&snapshot, route.as_deref())?;
        }
        Commands::Version => {
            println!("QueueSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
