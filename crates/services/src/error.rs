//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SessionStateError;
use quiz_core::validation::Violations;
use storage::repository::StorageError;

/// Errors emitted by the quiz session use cases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    /// The submission broke a format or membership rule; the player can fix it.
    #[error("invalid submission: {0}")]
    Invalid(Violations),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizSessionError {
    /// True for input errors the caller should report back to the player.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    #[must_use]
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Invalid(v) => Some(v),
            _ => None,
        }
    }
}
