mod completion;
mod service;
mod start;
mod submit;
#[cfg(test)]
mod testing;

// Public API of the quiz session subsystem.
pub use crate::error::QuizSessionError;
pub use quiz_core::validation::SubmitResponseInput;
pub use service::QuizSessionService;
pub use start::{StartQuizSession, StartQuizSessionInput};
pub use submit::{SubmitResponse, SubmitResponseResult};
