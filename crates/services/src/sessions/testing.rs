use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use quiz_core::model::{
    Answer, AnswerId, Format, Question, QuestionId, Quiz, QuizId, Response, Session, SessionId,
};
use storage::repository::{ResponseGateway, SessionGateway, SessionRecord, StorageError};

/// Which gateway operation a fake should fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailOn {
    Nothing,
    Start,
    Submit,
    Finish,
}

/// Gateway fake that records every call in order.
#[derive(Debug)]
pub(crate) struct RecordingGateway {
    calls: Mutex<Vec<&'static str>>,
    fail_on: Mutex<FailOn>,
}

impl RecordingGateway {
    pub(crate) fn new() -> Arc<Self> {
        Self::failing_on(FailOn::Nothing)
    }

    pub(crate) fn failing_on(fail_on: FailOn) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(fail_on),
        })
    }

    pub(crate) fn heal(&self) {
        *self.fail_on.lock().unwrap() = FailOn::Nothing;
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str, fail: FailOn) -> Result<(), StorageError> {
        if *self.fail_on.lock().unwrap() == fail {
            return Err(StorageError::Connection(format!("{op} unavailable")));
        }
        self.calls.lock().unwrap().push(op);
        Ok(())
    }
}

#[async_trait]
impl SessionGateway for RecordingGateway {
    async fn start(&self, _session: &Session) -> Result<(), StorageError> {
        self.record("start", FailOn::Start)
    }

    async fn finish(&self, session: &Session) -> Result<(), StorageError> {
        assert!(session.finished_at().is_some(), "finish called on unfinished session");
        self.record("finish", FailOn::Finish)
    }

    async fn get_session(&self, _id: SessionId) -> Result<SessionRecord, StorageError> {
        Err(StorageError::NotFound)
    }
}

#[async_trait]
impl ResponseGateway for RecordingGateway {
    async fn submit(&self, response: &Response) -> Result<(), StorageError> {
        assert!(response.is_answered(), "submit called on pending response");
        self.record("submit", FailOn::Submit)
    }
}

/// Quiz of unique-format questions; answer `good_index` of each is the good one.
pub(crate) fn unique_quiz(questions: u64, answers: u64, good_index: u64) -> Arc<Quiz> {
    let quiz_id = QuizId::new(1);
    let mut quiz = Quiz::new(quiz_id, "Quiz");
    for q in 1..=questions {
        let mut question = Question::new(QuestionId::new(q), quiz_id, format!("Q{q}"), Format::Unique);
        for a in 1..=answers {
            question
                .add_answer(Answer::new(AnswerId::new(a), format!("A{a}"), a == good_index))
                .unwrap();
        }
        quiz.add_question(question).unwrap();
    }
    Arc::new(quiz)
}
