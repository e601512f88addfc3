use std::sync::Arc;

use quiz_core::model::{PlayerId, Quiz, Session};
use storage::repository::SessionGateway;

use super::completion::finish_if_complete;
use crate::Clock;
use crate::error::QuizSessionError;

/// Which player takes which quiz.
#[derive(Debug, Clone)]
pub struct StartQuizSessionInput {
    pub player_id: PlayerId,
    pub quiz: Arc<Quiz>,
}

/// Creates a session with one pending response per quiz question and persists it.
#[derive(Clone)]
pub struct StartQuizSession {
    clock: Clock,
    sessions: Arc<dyn SessionGateway>,
}

impl StartQuizSession {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn SessionGateway>) -> Self {
        Self { clock, sessions }
    }

    /// Start a session and store it through the session gateway.
    ///
    /// A quiz without questions has nothing left to answer, so its session is
    /// finished (and `finish` persisted) right after `start`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` if the gateway fails; nothing is
    /// returned to the caller in that case.
    pub async fn execute(&self, input: StartQuizSessionInput) -> Result<Session, QuizSessionError> {
        let now = self.clock.now();
        let mut session = Session::start(input.player_id, input.quiz, now);
        self.sessions.start(&session).await?;

        tracing::info!(
            session_id = %session.id(),
            player_id = %session.player_id(),
            quiz_id = %session.quiz().id(),
            responses = session.responses().len(),
            "Quiz session started"
        );

        finish_if_complete(self.sessions.as_ref(), &mut session, now).await?;
        Ok(session)
    }
}
