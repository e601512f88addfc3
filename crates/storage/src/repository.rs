use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerId, PlayerId, QuestionId, Quiz, QuizId, Response, ResponseId, Session, SessionId,
    SessionStateError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a response slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub question_id: QuestionId,
    pub answers: Vec<AnswerId>,
    pub valid: bool,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ResponseRecord {
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        Self {
            id: response.id(),
            question_id: response.question_id(),
            answers: response.answers().to_vec(),
            valid: response.is_valid(),
            responded_at: response.responded_at(),
        }
    }
}

/// Persisted shape of a session and its responses, in quiz order.
///
/// The quiz itself is stored separately; only its id is kept here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub player_id: PlayerId,
    pub quiz_id: QuizId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub responses: Vec<ResponseRecord>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.id(),
            player_id: session.player_id(),
            quiz_id: session.quiz().id(),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
            responses: session
                .responses()
                .iter()
                .map(ResponseRecord::from_response)
                .collect(),
        }
    }

    /// Convert the record back into a domain `Session` bound to `quiz`.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the record no longer matches the quiz or
    /// violates the session invariants.
    pub fn into_session(self, quiz: Arc<Quiz>) -> Result<Session, SessionStateError> {
        let responses = self
            .responses
            .into_iter()
            .map(|r| {
                Response::from_persisted(
                    r.id,
                    self.id,
                    r.question_id,
                    r.answers,
                    r.valid,
                    r.responded_at,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Session::from_persisted(
            self.id,
            self.player_id,
            quiz,
            responses,
            self.started_at,
            self.finished_at,
        )
    }
}

/// Repository contract for authored quiz content.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz with all of its questions and answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;
}

/// Session store collaborator.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Persist a newly started session together with its pending responses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session already exists.
    async fn start(&self, session: &Session) -> Result<(), StorageError>;

    /// Persist the `finished_at` of a session that has just been finished.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored session is already finished
    /// or still has unanswered responses, `StorageError::NotFound` if missing.
    async fn finish(&self, session: &Session) -> Result<(), StorageError>;

    /// Fetch a persisted session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError>;
}

/// Response store collaborator.
#[async_trait]
pub trait ResponseGateway: Send + Sync {
    /// Persist an answered response: selection, validity and timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored response was already answered,
    /// `StorageError::NotFound` if the response is unknown.
    async fn submit(&self, response: &Response) -> Result<(), StorageError>;
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(lock_err)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let guard = self.quizzes.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SessionGateway for InMemoryRepository {
    async fn start(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), SessionRecord::from_session(session));
        Ok(())
    }

    async fn finish(&self, session: &Session) -> Result<(), StorageError> {
        let finished_at = session
            .finished_at()
            .ok_or_else(|| StorageError::Serialization("session has no finished_at".into()))?;
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        let record = guard.get_mut(&session.id()).ok_or(StorageError::NotFound)?;
        if record.finished_at.is_some()
            || record.responses.iter().any(|r| r.responded_at.is_none())
        {
            return Err(StorageError::Conflict);
        }
        record.finished_at = Some(finished_at);
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let guard = self.sessions.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ResponseGateway for InMemoryRepository {
    async fn submit(&self, response: &Response) -> Result<(), StorageError> {
        if !response.is_answered() {
            return Err(StorageError::Serialization(
                "response has no responded_at".into(),
            ));
        }
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        let record = guard
            .get_mut(&response.session_id())
            .ok_or(StorageError::NotFound)?;
        let slot = record
            .responses
            .iter_mut()
            .find(|r| r.id == response.id())
            .ok_or(StorageError::NotFound)?;
        if slot.responded_at.is_some() {
            return Err(StorageError::Conflict);
        }
        *slot = ResponseRecord::from_response(response);
        Ok(())
    }
}

/// Aggregates quiz, session and response stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub sessions: Arc<dyn SessionGateway>,
    pub responses: Arc<dyn ResponseGateway>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionGateway> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseGateway> = Arc::new(repo);
        Self {
            quizzes,
            sessions,
            responses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Answer, Format, Question};
    use quiz_core::time::fixed_now;

    fn build_quiz() -> Quiz {
        let quiz_id = QuizId::new(1);
        let mut quiz = Quiz::new(quiz_id, "Quiz");
        for q in 1..=2 {
            let question = Question::new(QuestionId::new(q), quiz_id, format!("Q{q}"), Format::Unique)
                .with_answer(Answer::new(AnswerId::new(1), "yes", true))
                .unwrap()
                .with_answer(Answer::new(AnswerId::new(2), "no", false))
                .unwrap();
            quiz.add_question(question).unwrap();
        }
        quiz
    }

    fn answer_all(session: &mut Session) -> Vec<Response> {
        let ids: Vec<_> = session.responses().iter().map(Response::id).collect();
        let mut answered = Vec::new();
        for id in ids {
            let staged = session
                .answered_response(id, vec![AnswerId::new(1)], fixed_now())
                .unwrap();
            session.commit_response(staged.clone()).unwrap();
            answered.push(staged);
        }
        answered
    }

    #[tokio::test]
    async fn round_trips_session_through_record() {
        let repo = InMemoryRepository::new();
        let quiz = Arc::new(build_quiz());
        repo.upsert_quiz(&quiz).await.unwrap();

        let mut session = Session::start(PlayerId::new(3), Arc::clone(&quiz), fixed_now());
        repo.start(&session).await.unwrap();

        let answered = answer_all(&mut session);
        repo.submit(&answered[0]).await.unwrap();

        let record = repo.get_session(session.id()).await.unwrap();
        assert_eq!(record.quiz_id, quiz.id());
        assert_eq!(record.responses[0].answers, vec![AnswerId::new(1)]);
        assert!(record.responses[1].responded_at.is_none());

        let loaded = record.into_session(quiz).unwrap();
        assert_eq!(loaded.progress().answered, 1);
        assert!(loaded.responses()[0].is_valid());
    }

    #[tokio::test]
    async fn rejects_double_start_submit_and_finish() {
        let repo = InMemoryRepository::new();
        let mut session = Session::start(PlayerId::new(1), Arc::new(build_quiz()), fixed_now());
        repo.start(&session).await.unwrap();
        assert!(matches!(repo.start(&session).await, Err(StorageError::Conflict)));

        let answered = answer_all(&mut session);
        session.finish(fixed_now()).unwrap();

        // finish before every response is persisted loses the race
        repo.submit(&answered[0]).await.unwrap();
        assert!(matches!(repo.finish(&session).await, Err(StorageError::Conflict)));

        repo.submit(&answered[1]).await.unwrap();
        assert!(matches!(
            repo.submit(&answered[1]).await,
            Err(StorageError::Conflict)
        ));

        repo.finish(&session).await.unwrap();
        assert!(matches!(repo.finish(&session).await, Err(StorageError::Conflict)));
        let record = repo.get_session(session.id()).await.unwrap();
        assert_eq!(record.finished_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.get_session(SessionId::generate()).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.get_quiz(QuizId::new(99)).await,
            Err(StorageError::NotFound)
        ));
    }
}
