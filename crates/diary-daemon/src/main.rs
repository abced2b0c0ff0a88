//! Auditory diary command-line tool.
//!
//! # Usage
//!
//! ```bash
//! musitory capsule generate --records day.json [--date 2024-03-01] [--user ID] [--out FILE]
//! musitory capsule preview --records day.json
//! musitory config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/musitory/config.toml)
//! 3. `--config` file
//! 4. Environment variables (DIARY_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use diary_daemon::{handle_capsule, init_logging, load_settings, show_config, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Capsule { command } => {
            handle_capsule(&settings, command).await?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
    }

    Ok(())
}
