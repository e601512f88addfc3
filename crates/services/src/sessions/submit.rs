use std::sync::Arc;

use quiz_core::model::{ResponseId, Session};
use quiz_core::validation::SubmitResponseInput;
use storage::repository::{ResponseGateway, SessionGateway};

use super::completion::finish_if_complete;
use crate::Clock;
use crate::error::QuizSessionError;

/// Outcome of recording one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitResponseResult {
    pub response_id: ResponseId,
    pub valid: bool,
    pub session_finished: bool,
}

/// Validates, scores and stores a player's answer to one response, finishing
/// the session once the last response is in.
#[derive(Clone)]
pub struct SubmitResponse {
    clock: Clock,
    responses: Arc<dyn ResponseGateway>,
    sessions: Arc<dyn SessionGateway>,
}

impl SubmitResponse {
    #[must_use]
    pub fn new(
        clock: Clock,
        responses: Arc<dyn ResponseGateway>,
        sessions: Arc<dyn SessionGateway>,
    ) -> Self {
        Self {
            clock,
            responses,
            sessions,
        }
    }

    /// Record `input` on its response within `session`.
    ///
    /// Violations are checked before anything is touched. The scored response is
    /// persisted before it is committed into `session`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Invalid` for format/membership violations,
    /// `QuizSessionError::State` if the response is foreign or already answered,
    /// and `QuizSessionError::Storage` if a gateway call fails.
    pub async fn execute(
        &self,
        session: &mut Session,
        input: SubmitResponseInput,
    ) -> Result<SubmitResponseResult, QuizSessionError> {
        let violations = input.validate(session)?;
        if !violations.is_empty() {
            tracing::warn!(
                session_id = %session.id(),
                response_id = %input.response_id,
                violations = %violations,
                "Submission rejected"
            );
            return Err(QuizSessionError::Invalid(violations));
        }

        let now = self.clock.now();
        let response = session.answered_response(input.response_id, input.answers, now)?;
        self.responses.submit(&response).await?;

        let valid = response.is_valid();
        session.commit_response(response)?;
        tracing::debug!(
            session_id = %session.id(),
            response_id = %input.response_id,
            valid,
            "Response recorded"
        );

        let session_finished = finish_if_complete(self.sessions.as_ref(), session, now).await?;

        Ok(SubmitResponseResult {
            response_id: input.response_id,
            valid,
            session_finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::testing::{FailOn, RecordingGateway, unique_quiz};
    use chrono::Duration;
    use quiz_core::model::{AnswerId, PlayerId, SessionStateError};
    use quiz_core::time::fixed_now;
    use quiz_core::validation::Violation;
    use storage::repository::StorageError;

    fn setup(gateway: &Arc<RecordingGateway>, questions: u64) -> (SubmitResponse, Session) {
        let session = Session::start(PlayerId::new(1), unique_quiz(questions, 3, 2), fixed_now());
        let submit = SubmitResponse::new(Clock::fixed(fixed_now()), gateway.clone(), gateway.clone());
        (submit, session)
    }

    #[tokio::test]
    async fn good_answer_is_valid_and_persisted_once() {
        let gateway = RecordingGateway::new();
        let (submit, mut session) = setup(&gateway, 2);
        let response_id = session.responses()[0].id();

        let result = submit
            .execute(&mut session, SubmitResponseInput::new(response_id, [AnswerId::new(2)]))
            .await
            .unwrap();

        assert!(result.valid);
        assert!(!result.session_finished);
        let response = session.response(response_id).unwrap();
        assert_eq!(response.answers(), &[AnswerId::new(2)]);
        assert_eq!(response.responded_at(), Some(fixed_now()));
        assert_eq!(gateway.calls(), vec!["submit"]);
    }

    #[tokio::test]
    async fn responded_at_and_finish_follow_the_clock() {
        let gateway = RecordingGateway::new();
        let (_, mut session) = setup(&gateway, 1);
        let mut clock = Clock::fixed(fixed_now());
        clock.advance(Duration::seconds(90));
        let submit = SubmitResponse::new(clock, gateway.clone(), gateway.clone());
        let response_id = session.responses()[0].id();

        submit
            .execute(&mut session, SubmitResponseInput::new(response_id, [AnswerId::new(2)]))
            .await
            .unwrap();

        let later = fixed_now() + Duration::seconds(90);
        assert_eq!(session.started_at(), fixed_now());
        assert_eq!(session.responses()[0].responded_at(), Some(later));
        assert_eq!(session.finished_at(), Some(later));
    }

    #[tokio::test]
    async fn violations_block_submission_without_side_effects() {
        let gateway = RecordingGateway::new();
        let (submit, mut session) = setup(&gateway, 1);
        let response_id = session.responses()[0].id();

        let err = submit
            .execute(
                &mut session,
                SubmitResponseInput::new(response_id, [AnswerId::new(1), AnswerId::new(7)]),
            )
            .await
            .unwrap_err();

        assert!(err.is_user_error());
        let violations = err.violations().unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::AnswerNotInQuestion { .. })));
        assert!(!session.responses()[0].is_answered());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn resubmission_is_a_precondition_failure() {
        let gateway = RecordingGateway::new();
        let (submit, mut session) = setup(&gateway, 2);
        let response_id = session.responses()[0].id();
        let input = SubmitResponseInput::new(response_id, [AnswerId::new(1)]);

        submit.execute(&mut session, input.clone()).await.unwrap();
        let err = submit.execute(&mut session, input).await.unwrap_err();

        assert!(matches!(
            err,
            QuizSessionError::State(SessionStateError::AlreadyResponded(id)) if id == response_id
        ));
        assert!(!err.is_user_error());
        assert_eq!(gateway.count("submit"), 1);
    }

    #[tokio::test]
    async fn last_response_finishes_session_after_all_submits() {
        let gateway = RecordingGateway::new();
        let (submit, mut session) = setup(&gateway, 3);
        let ids: Vec<_> = session.responses().iter().map(|r| r.id()).collect();

        for (i, id) in ids.iter().enumerate() {
            let result = submit
                .execute(&mut session, SubmitResponseInput::new(*id, [AnswerId::new(3)]))
                .await
                .unwrap();
            assert!(!result.valid);
            assert_eq!(result.session_finished, i == ids.len() - 1);
        }

        assert_eq!(session.finished_at(), Some(fixed_now()));
        assert_eq!(gateway.calls(), vec!["submit", "submit", "submit", "finish"]);
    }

    #[tokio::test]
    async fn failed_submit_leaves_response_pending() {
        let gateway = RecordingGateway::failing_on(FailOn::Submit);
        let (submit, mut session) = setup(&gateway, 1);
        let response_id = session.responses()[0].id();

        let err = submit
            .execute(&mut session, SubmitResponseInput::new(response_id, [AnswerId::new(2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, QuizSessionError::Storage(StorageError::Connection(_))));
        assert!(!session.responses()[0].is_answered());
        assert!(session.finished_at().is_none());
    }

    #[tokio::test]
    async fn failed_finish_keeps_answer_but_not_finish() {
        let gateway = RecordingGateway::failing_on(FailOn::Finish);
        let (submit, mut session) = setup(&gateway, 1);
        let response_id = session.responses()[0].id();

        let err = submit
            .execute(&mut session, SubmitResponseInput::new(response_id, [AnswerId::new(2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, QuizSessionError::Storage(_)));
        assert!(session.responses()[0].is_answered());
        assert!(session.is_complete());
        assert!(session.finished_at().is_none());
    }
}
