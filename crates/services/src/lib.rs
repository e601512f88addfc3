#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;

pub use error::QuizSessionError;
pub use sessions::{
    QuizSessionService, StartQuizSession, StartQuizSessionInput, SubmitResponse,
    SubmitResponseResult,
};
