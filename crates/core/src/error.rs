use thiserror::Error;

use crate::model::{QuizError, SessionStateError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    SessionState(#[from] SessionStateError),
}
