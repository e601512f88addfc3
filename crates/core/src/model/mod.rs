mod ids;
mod quiz;
mod session;

pub use ids::{AnswerId, ParseIdError, PlayerId, QuestionId, QuizId, ResponseId, SessionId};
pub use quiz::{Answer, Format, Question, Quiz, QuizError};
pub use session::{Response, Session, SessionProgress, SessionStateError};
