//! CLI argument parsing for `musitory`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Auditory diary
///
/// Turns a day of listening history into a short diary capsule.
#[derive(Parser, Debug)]
#[command(name = "musitory")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/musitory/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Daily capsule commands
    Capsule {
        #[command(subcommand)]
        command: CapsuleCommands,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

/// Capsule subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CapsuleCommands {
    /// Generate and print the capsule for one day
    Generate {
        /// JSON file with an array of listening records
        #[arg(short, long)]
        records: PathBuf,

        /// Day to summarize (YYYY-MM-DD, diary timezone). Defaults to the
        /// day of the most recent record.
        #[arg(short, long)]
        date: Option<String>,

        /// Owner of the records
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Write the capsule JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show aggregate, prompt and theme without calling the backend
    Preview {
        /// JSON file with an array of listening records
        #[arg(short, long)]
        records: PathBuf,
    },
}
