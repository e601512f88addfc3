use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::model::ids::{AnswerId, PlayerId, QuestionId, ResponseId, SessionId};
use crate::model::quiz::{Question, Quiz};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Precondition failures on session state. These indicate a caller bug or a
/// lost race, never a user-correctable input problem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("response {0} does not belong to this session")]
    UnknownResponse(ResponseId),

    #[error("question {0} is not part of the session quiz")]
    UnknownQuestion(QuestionId),

    #[error("response {0} has already been answered")]
    AlreadyResponded(ResponseId),

    #[error("response {0} has not been answered")]
    NotResponded(ResponseId),

    #[error("session {0} is already finished")]
    AlreadyFinished(SessionId),

    #[error("session {0} still has unanswered responses")]
    Incomplete(SessionId),

    #[error("session has {actual} responses but the quiz has {expected} questions")]
    ResponseCountMismatch { expected: usize, actual: usize },

    #[error("persisted response {0} is inconsistent")]
    InconsistentResponse(ResponseId),

    #[error("persisted session {0} is finished but still has unanswered responses")]
    InconsistentFinish(SessionId),

    #[error("question {0} has more than one response in the session")]
    DuplicateResponse(QuestionId),
}

//
// ─── RESPONSE ──────────────────────────────────────────────────────────────────
//

/// A player's answer selection for one question of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: ResponseId,
    session_id: SessionId,
    question_id: QuestionId,
    answers: Vec<AnswerId>,
    valid: bool,
    responded_at: Option<DateTime<Utc>>,
}

impl Response {
    fn pending(session_id: SessionId, question_id: QuestionId) -> Self {
        Self {
            id: ResponseId::generate(),
            session_id,
            question_id,
            answers: Vec::new(),
            valid: false,
            responded_at: None,
        }
    }

    /// Rehydrate a response from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InconsistentResponse` if an unanswered response
    /// carries answers or a validity flag.
    pub fn from_persisted(
        id: ResponseId,
        session_id: SessionId,
        question_id: QuestionId,
        answers: Vec<AnswerId>,
        valid: bool,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        if responded_at.is_none() && (valid || !answers.is_empty()) {
            return Err(SessionStateError::InconsistentResponse(id));
        }
        Ok(Self {
            id,
            session_id,
            question_id,
            answers,
            valid,
            responded_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ResponseId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    /// Selected answers in submission order, without duplicates.
    #[must_use]
    pub fn answers(&self) -> &[AnswerId] {
        &self.answers
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.responded_at.is_some()
    }

    fn record(
        &mut self,
        question: &Question,
        mut answers: Vec<AnswerId>,
        responded_at: DateTime<Utc>,
    ) -> Result<(), SessionStateError> {
        if self.is_answered() {
            return Err(SessionStateError::AlreadyResponded(self.id));
        }
        let mut seen = std::collections::HashSet::with_capacity(answers.len());
        answers.retain(|id| seen.insert(*id));

        self.valid = question.is_correct_selection(&answers);
        self.answers = answers;
        self.responded_at = Some(responded_at);
        Ok(())
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Snapshot of how far a session has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub valid: usize,
    pub remaining: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One player's attempt at a quiz.
///
/// The session holds exactly one response per quiz question, created together
/// at start and never added or removed afterwards. The quiz is shared authored
/// content; responses refer back to the session and question by id only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    player_id: PlayerId,
    quiz: Arc<Quiz>,
    responses: Vec<Response>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a fresh session with one pending response per question, in quiz order.
    #[must_use]
    pub fn start(player_id: PlayerId, quiz: Arc<Quiz>, started_at: DateTime<Utc>) -> Self {
        let id = SessionId::generate();
        let responses = quiz
            .questions()
            .iter()
            .map(|question| Response::pending(id, question.id()))
            .collect();

        Self {
            id,
            player_id,
            quiz,
            responses,
            started_at,
            finished_at: None,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if responses do not map 1:1 onto the quiz
    /// questions, belong to another session, or the session is finished with
    /// responses still pending.
    pub fn from_persisted(
        id: SessionId,
        player_id: PlayerId,
        quiz: Arc<Quiz>,
        responses: Vec<Response>,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        if responses.len() != quiz.question_count() {
            return Err(SessionStateError::ResponseCountMismatch {
                expected: quiz.question_count(),
                actual: responses.len(),
            });
        }
        let mut covered = std::collections::HashSet::with_capacity(responses.len());
        for response in &responses {
            if response.session_id != id {
                return Err(SessionStateError::UnknownResponse(response.id));
            }
            if quiz.question(response.question_id).is_none() {
                return Err(SessionStateError::UnknownQuestion(response.question_id));
            }
            if !covered.insert(response.question_id) {
                return Err(SessionStateError::DuplicateResponse(response.question_id));
            }
        }

        let session = Self {
            id,
            player_id,
            quiz,
            responses,
            started_at,
            finished_at,
        };
        // Complete but unfinished is legal: the finish call may have failed.
        if session.is_finished() && !session.is_complete() {
            return Err(SessionStateError::InconsistentFinish(id));
        }
        Ok(session)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Shared handle to the quiz, for rebuilding sessions.
    #[must_use]
    pub fn shared_quiz(&self) -> Arc<Quiz> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    #[must_use]
    pub fn response(&self, id: ResponseId) -> Option<&Response> {
        self.responses.iter().find(|r| r.id == id)
    }

    /// Resolve the question a response answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownResponse` if the response is not part of
    /// this session.
    pub fn question_for(&self, response_id: ResponseId) -> Result<&Question, SessionStateError> {
        let response = self
            .response(response_id)
            .ok_or(SessionStateError::UnknownResponse(response_id))?;
        self.quiz
            .question(response.question_id)
            .ok_or(SessionStateError::UnknownQuestion(response.question_id))
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// True when every response has been answered (vacuously true for an empty quiz).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.responses.iter().all(Response::is_answered)
    }

    /// First response still waiting for an answer, in quiz order.
    #[must_use]
    pub fn next_pending(&self) -> Option<&Response> {
        self.responses.iter().find(|r| !r.is_answered())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.responses.len();
        let answered = self.responses.iter().filter(|r| r.is_answered()).count();
        let valid = self.responses.iter().filter(|r| r.is_valid()).count();
        SessionProgress {
            total,
            answered,
            valid,
            remaining: total - answered,
        }
    }

    /// Score a selection against a response without touching the session.
    ///
    /// Returns the answered copy of the response; apply it with
    /// [`Session::commit_response`] once it has been persisted.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownResponse` for a foreign response and
    /// `SessionStateError::AlreadyResponded` if it was answered before.
    pub fn answered_response(
        &self,
        response_id: ResponseId,
        answers: Vec<AnswerId>,
        responded_at: DateTime<Utc>,
    ) -> Result<Response, SessionStateError> {
        let question = self.question_for(response_id)?;
        let mut response = self
            .response(response_id)
            .cloned()
            .ok_or(SessionStateError::UnknownResponse(response_id))?;
        response.record(question, answers, responded_at)?;
        Ok(response)
    }

    /// Replace a pending response slot with its answered version.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the response is foreign, unanswered, or the
    /// slot was already answered.
    pub fn commit_response(&mut self, response: Response) -> Result<(), SessionStateError> {
        if !response.is_answered() {
            return Err(SessionStateError::NotResponded(response.id));
        }
        let slot = self
            .responses
            .iter_mut()
            .find(|r| r.id == response.id)
            .ok_or(SessionStateError::UnknownResponse(response.id))?;
        if slot.is_answered() {
            return Err(SessionStateError::AlreadyResponded(response.id));
        }
        *slot = response;
        Ok(())
    }

    /// Set `finished_at`. Only legal once, after every response is answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AlreadyFinished` or `SessionStateError::Incomplete`.
    pub fn finish(&mut self, finished_at: DateTime<Utc>) -> Result<(), SessionStateError> {
        if self.is_finished() {
            return Err(SessionStateError::AlreadyFinished(self.id));
        }
        if !self.is_complete() {
            return Err(SessionStateError::Incomplete(self.id));
        }
        self.finished_at = Some(finished_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuizId;
    use crate::model::quiz::{Answer, Format};
    use crate::time::fixed_now;

    fn build_quiz(questions: u64) -> Arc<Quiz> {
        let quiz_id = QuizId::new(1);
        let mut quiz = Quiz::new(quiz_id, "Quiz");
        for q in 1..=questions {
            let mut question = Question::new(QuestionId::new(q), quiz_id, format!("Q{q}"), Format::Unique);
            question.add_answer(Answer::new(AnswerId::new(1), "right", true)).unwrap();
            question.add_answer(Answer::new(AnswerId::new(2), "wrong", false)).unwrap();
            quiz.add_question(question).unwrap();
        }
        Arc::new(quiz)
    }

    #[test]
    fn start_creates_one_pending_response_per_question() {
        let quiz = build_quiz(3);
        let session = Session::start(PlayerId::new(7), Arc::clone(&quiz), fixed_now());

        assert_eq!(session.responses().len(), 3);
        assert_eq!(session.player_id(), PlayerId::new(7));
        assert!(session.finished_at().is_none());
        for (response, question) in session.responses().iter().zip(quiz.questions()) {
            assert_eq!(response.question_id(), question.id());
            assert_eq!(response.session_id(), session.id());
            assert!(response.answers().is_empty());
            assert!(!response.is_valid());
            assert!(response.responded_at().is_none());
        }
    }

    #[test]
    fn answered_response_does_not_mutate_until_committed() {
        let mut session = Session::start(PlayerId::new(1), build_quiz(1), fixed_now());
        let id = session.responses()[0].id();

        let staged = session
            .answered_response(id, vec![AnswerId::new(1)], fixed_now())
            .unwrap();
        assert!(staged.is_valid());
        assert!(!session.responses()[0].is_answered());

        session.commit_response(staged).unwrap();
        assert!(session.responses()[0].is_answered());
        assert_eq!(session.responses()[0].answers(), &[AnswerId::new(1)]);
    }

    #[test]
    fn second_answer_is_rejected() {
        let mut session = Session::start(PlayerId::new(1), build_quiz(2), fixed_now());
        let id = session.responses()[0].id();
        let staged = session
            .answered_response(id, vec![AnswerId::new(2)], fixed_now())
            .unwrap();
        assert!(!staged.is_valid());
        session.commit_response(staged).unwrap();

        let err = session
            .answered_response(id, vec![AnswerId::new(1)], fixed_now())
            .unwrap_err();
        assert_eq!(err, SessionStateError::AlreadyResponded(id));
    }

    #[test]
    fn duplicate_selections_collapse_in_order() {
        let session = Session::start(PlayerId::new(1), build_quiz(1), fixed_now());
        let id = session.responses()[0].id();
        let staged = session
            .answered_response(
                id,
                vec![AnswerId::new(2), AnswerId::new(1), AnswerId::new(2)],
                fixed_now(),
            )
            .unwrap();
        assert_eq!(staged.answers(), &[AnswerId::new(2), AnswerId::new(1)]);
    }

    #[test]
    fn foreign_response_is_unknown() {
        let session = Session::start(PlayerId::new(1), build_quiz(1), fixed_now());
        let other = Session::start(PlayerId::new(1), build_quiz(1), fixed_now());
        let foreign = other.responses()[0].id();
        assert_eq!(
            session.question_for(foreign).unwrap_err(),
            SessionStateError::UnknownResponse(foreign)
        );
    }

    #[test]
    fn finish_requires_every_response_answered() {
        let mut session = Session::start(PlayerId::new(1), build_quiz(2), fixed_now());
        assert_eq!(
            session.finish(fixed_now()).unwrap_err(),
            SessionStateError::Incomplete(session.id())
        );

        let ids: Vec<_> = session.responses().iter().map(Response::id).collect();
        for id in ids {
            let staged = session
                .answered_response(id, vec![AnswerId::new(1)], fixed_now())
                .unwrap();
            session.commit_response(staged).unwrap();
        }
        assert!(session.is_complete());
        session.finish(fixed_now()).unwrap();
        assert_eq!(session.finished_at(), Some(fixed_now()));
        assert!(matches!(
            session.finish(fixed_now()),
            Err(SessionStateError::AlreadyFinished(_))
        ));
        assert_eq!(
            session.progress(),
            SessionProgress {
                total: 2,
                answered: 2,
                valid: 2,
                remaining: 0
            }
        );
    }

    #[test]
    fn empty_quiz_session_is_complete_immediately() {
        let session = Session::start(PlayerId::new(1), build_quiz(0), fixed_now());
        assert!(session.responses().is_empty());
        assert!(session.is_complete());
        assert!(!session.is_finished());
    }

    #[test]
    fn from_persisted_checks_question_coverage() {
        let quiz = build_quiz(2);
        let session = Session::start(PlayerId::new(1), Arc::clone(&quiz), fixed_now());
        let only_first = vec![session.responses()[0].clone()];

        let err = Session::from_persisted(
            session.id(),
            session.player_id(),
            Arc::clone(&quiz),
            only_first,
            fixed_now(),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SessionStateError::ResponseCountMismatch {
                expected: 2,
                actual: 1
            }
        );

        let err = Session::from_persisted(
            session.id(),
            session.player_id(),
            quiz,
            session.responses().to_vec(),
            fixed_now(),
            Some(fixed_now()),
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::InconsistentFinish(session.id()));
    }

    #[test]
    fn from_persisted_rejects_two_responses_for_one_question() {
        let quiz = build_quiz(2);
        let session = Session::start(PlayerId::new(1), Arc::clone(&quiz), fixed_now());
        let first = &session.responses()[0];
        let twin = Response::from_persisted(
            ResponseId::generate(),
            session.id(),
            first.question_id(),
            Vec::new(),
            false,
            None,
        )
        .unwrap();

        let err = Session::from_persisted(
            session.id(),
            session.player_id(),
            quiz,
            vec![first.clone(), twin],
            fixed_now(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::DuplicateResponse(first.question_id()));
    }

    #[test]
    fn from_persisted_keeps_complete_but_unfinished_session() {
        let quiz = build_quiz(1);
        let mut session = Session::start(PlayerId::new(1), Arc::clone(&quiz), fixed_now());
        let id = session.responses()[0].id();
        let staged = session
            .answered_response(id, vec![AnswerId::new(1)], fixed_now())
            .unwrap();
        session.commit_response(staged).unwrap();

        let rebuilt = Session::from_persisted(
            session.id(),
            session.player_id(),
            quiz,
            session.responses().to_vec(),
            session.started_at(),
            None,
        )
        .unwrap();
        assert!(rebuilt.is_complete());
        assert!(!rebuilt.is_finished());
        assert_eq!(rebuilt, session);
    }

    #[test]
    fn unanswered_persisted_response_cannot_carry_answers() {
        let err = Response::from_persisted(
            ResponseId::generate(),
            SessionId::generate(),
            QuestionId::new(1),
            vec![AnswerId::new(1)],
            false,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SessionStateError::InconsistentResponse(_)));
    }
}
