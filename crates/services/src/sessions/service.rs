use std::sync::Arc;

use quiz_core::model::{PlayerId, Quiz, QuizId, Session, SessionId};
use quiz_core::validation::SubmitResponseInput;
use storage::repository::{QuizRepository, ResponseGateway, SessionGateway, Storage};

use super::completion::finish_if_complete;
use super::start::{StartQuizSession, StartQuizSessionInput};
use super::submit::{SubmitResponse, SubmitResponseResult};
use crate::Clock;
use crate::error::QuizSessionError;

/// Orchestrates quiz loading, session start, answering and resumption.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    sessions: Arc<dyn SessionGateway>,
    start: StartQuizSession,
    submit: SubmitResponse,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        sessions: Arc<dyn SessionGateway>,
        responses: Arc<dyn ResponseGateway>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            start: StartQuizSession::new(clock, Arc::clone(&sessions)),
            submit: SubmitResponse::new(clock, responses, Arc::clone(&sessions)),
            sessions,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.responses),
        )
    }

    /// Load a quiz from storage and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` if the quiz is missing or the session
    /// cannot be stored.
    pub async fn start_session(
        &self,
        player_id: PlayerId,
        quiz_id: QuizId,
    ) -> Result<Session, QuizSessionError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        self.start_with_quiz(player_id, Arc::new(quiz)).await
    }

    /// Start a session on an already loaded quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` if the session cannot be stored.
    pub async fn start_with_quiz(
        &self,
        player_id: PlayerId,
        quiz: Arc<Quiz>,
    ) -> Result<Session, QuizSessionError> {
        self.start
            .execute(StartQuizSessionInput { player_id, quiz })
            .await
    }

    /// Submit an answer selection for one response of `session`.
    ///
    /// # Errors
    ///
    /// See [`SubmitResponse::execute`].
    pub async fn submit(
        &self,
        session: &mut Session,
        input: SubmitResponseInput,
    ) -> Result<SubmitResponseResult, QuizSessionError> {
        self.submit.execute(session, input).await
    }

    /// Rebuild a persisted session together with its quiz.
    ///
    /// A session whose responses were all stored but whose finish never was is
    /// finished here.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` if the session or quiz is missing or
    /// the pending finish cannot be stored, and `QuizSessionError::State` if the
    /// stored rows break session invariants.
    pub async fn resume_session(&self, id: SessionId) -> Result<Session, QuizSessionError> {
        let record = self.sessions.get_session(id).await?;
        let quiz = self.quizzes.get_quiz(record.quiz_id).await?;
        let mut session = record.into_session(Arc::new(quiz))?;
        tracing::debug!(
            session_id = %id,
            answered = session.progress().answered,
            "Quiz session resumed"
        );
        self.finalize(&mut session).await?;
        Ok(session)
    }

    /// Retry the finish step for a session whose last answer was stored but
    /// whose finish was not (e.g. the store failed in between).
    ///
    /// Returns `false` when there is nothing to do.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Storage` if persisting the finish fails again.
    pub async fn finalize(&self, session: &mut Session) -> Result<bool, QuizSessionError> {
        finish_if_complete(self.sessions.as_ref(), session, self.clock.now()).await
    }
}
