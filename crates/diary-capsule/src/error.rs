//! Errors surfaced by the capsule service.
//!
//! Generation itself never fails; these cover setup, storage and the
//! request-level checks around it.

use thiserror::Error;

use diary_types::DiaryError;

use crate::backend::BackendError;
use crate::genre::GenreError;

#[derive(Debug, Error)]
pub enum CapsuleError {
    /// A capsule already exists for the user and date
    #[error("Capsule already exists for {user_id} on {date}")]
    AlreadyExists { user_id: String, date: String },

    /// The user has no listening records for the date
    #[error("No listening records for {user_id} on {date}")]
    NoListening { user_id: String, date: String },

    /// No capsule exists for the user and date
    #[error("No capsule for {user_id} on {date}")]
    NotFound { user_id: String, date: String },

    /// Backend could not be constructed
    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    /// Genre client could not be constructed
    #[error("Genre client setup failed: {0}")]
    Genre(#[from] GenreError),

    #[error(transparent)]
    Diary(#[from] DiaryError),
}

impl CapsuleError {
    /// True for errors a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CapsuleError::NoListening { .. } | CapsuleError::NotFound { .. }
        )
    }

    /// True for duplicate-capsule errors.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CapsuleError::AlreadyExists { .. } | CapsuleError::Diary(DiaryError::Conflict(_))
        )
    }
}
