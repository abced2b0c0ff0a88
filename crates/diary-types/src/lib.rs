//! # diary-types
//!
//! Shared domain types for the auditory diary.
//!
//! This crate defines the core data structures used throughout the system:
//! - Listening records: what a user played, with weather and artwork context
//! - Capsules: the one-line daily summary and its presentation theme
//! - Day windows: calendar-day boundaries in the diary's timezone
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use diary_types::ListeningRecord;
//! ```

pub mod capsule;
pub mod config;
pub mod day;
pub mod error;
pub mod listening;

pub use capsule::{CapsuleSource, CapsuleSummary, DailyCapsule, ThemeTag};
pub use config::{
    CapsuleSettings, GenreSettings, Provider, Settings, MAX_ATTEMPTS, MAX_GENRE_ARTISTS,
    MAX_PROMPT_TRACKS,
};
pub use day::DayWindow;
pub use error::DiaryError;
pub use listening::ListeningRecord;
