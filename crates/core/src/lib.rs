#![forbid(unsafe_code)]
//! Domain model for taking quizzes: authored quiz content, player sessions,
//! and the rules a response submission must satisfy.

pub mod error;
pub mod model;
pub mod time;
pub mod validation;

pub use error::Error;
pub use time::Clock;
