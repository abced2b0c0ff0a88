//! Error types for the auditory diary.

use thiserror::Error;

/// Unified error type for diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record already exists for the given key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
