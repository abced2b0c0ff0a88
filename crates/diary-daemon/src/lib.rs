//! `musitory` library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (capsule generate/preview, config)

pub mod cli;
pub mod commands;

pub use cli::{CapsuleCommands, Cli, Commands};
pub use commands::{
    generate_capsule, handle_capsule, init_logging, load_settings, preview_capsule, read_records,
    show_config,
};
