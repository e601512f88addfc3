//! Structural checks on a response submission, run before any scoring.

use std::fmt;
use thiserror::Error;

use crate::model::{AnswerId, Format, Question, ResponseId, Session, SessionStateError};

/// A player's answer choice for one response of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponseInput {
    pub response_id: ResponseId,
    pub answers: Vec<AnswerId>,
}

impl SubmitResponseInput {
    #[must_use]
    pub fn new(response_id: ResponseId, answers: impl IntoIterator<Item = AnswerId>) -> Self {
        Self {
            response_id,
            answers: answers.into_iter().collect(),
        }
    }

    /// Check this submission against the question its response answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownResponse` if the response is not part of
    /// `session`; that is a precondition failure, not a violation.
    pub fn validate(&self, session: &Session) -> Result<Violations, SessionStateError> {
        let question = session.question_for(self.response_id)?;
        Ok(validate_selection(question, &self.answers))
    }
}

/// A user-correctable problem with a submission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Violation {
    #[error("a {format} question does not accept {selected} selected answer(s)")]
    FormatMismatch { format: Format, selected: usize },

    #[error("answers {} are not part of the question", join_ids(.answers))]
    AnswerNotInQuestion { answers: Vec<AnswerId> },
}

fn join_ids(ids: &[AnswerId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every violation found for one submission. Empty means the submission may proceed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was violated, otherwise the violations themselves.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one violation is present.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Apply the format/count rule and the membership rule to a selection.
///
/// Each rule contributes at most one violation.
#[must_use]
pub fn validate_selection(question: &Question, answers: &[AnswerId]) -> Violations {
    let mut violations = Vec::new();

    if !question.format().accepts(answers.len()) {
        violations.push(Violation::FormatMismatch {
            format: question.format(),
            selected: answers.len(),
        });
    }

    let foreign: Vec<AnswerId> = answers
        .iter()
        .copied()
        .filter(|id| !question.contains_answer(*id))
        .collect();
    if !foreign.is_empty() {
        violations.push(Violation::AnswerNotInQuestion { answers: foreign });
    }

    Violations(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, PlayerId, QuestionId, Quiz, QuizId};
    use crate::time::fixed_now;
    use std::sync::Arc;

    fn two_answer_question(format: Format) -> Question {
        Question::new(QuestionId::new(1), QuizId::new(1), "Pick", format)
            .with_answer(Answer::new(AnswerId::new(1), "one", true))
            .unwrap()
            .with_answer(Answer::new(AnswerId::new(2), "two", false))
            .unwrap()
    }

    #[test]
    fn unique_question_with_two_answers_has_one_violation() {
        let question = two_answer_question(Format::Unique);
        let violations = validate_selection(&question, &[AnswerId::new(1), AnswerId::new(2)]);

        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations.iter().next(),
            Some(&Violation::FormatMismatch {
                format: Format::Unique,
                selected: 2
            })
        );
    }

    #[test]
    fn answer_outside_question_has_one_violation() {
        let question = two_answer_question(Format::Unique);
        let violations = validate_selection(&question, &[AnswerId::new(3)]);

        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations.iter().next(),
            Some(Violation::AnswerNotInQuestion { answers }) if answers == &[AnswerId::new(3)]
        ));
    }

    #[test]
    fn both_rules_fire_independently() {
        let question = two_answer_question(Format::Unique);
        let violations = validate_selection(
            &question,
            &[AnswerId::new(1), AnswerId::new(3), AnswerId::new(4)],
        );
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn empty_selection_violates_both_formats() {
        assert_eq!(validate_selection(&two_answer_question(Format::Unique), &[]).len(), 1);
        assert_eq!(validate_selection(&two_answer_question(Format::Multiple), &[]).len(), 1);
    }

    #[test]
    fn well_formed_selection_passes() {
        let multiple = two_answer_question(Format::Multiple);
        assert!(validate_selection(&multiple, &[AnswerId::new(1), AnswerId::new(2)]).is_empty());

        let unique = two_answer_question(Format::Unique);
        assert!(validate_selection(&unique, &[AnswerId::new(2)])
            .into_result()
            .is_ok());
    }

    #[test]
    fn input_validate_resolves_question_through_session() {
        let mut quiz = Quiz::new(QuizId::new(1), "Quiz");
        quiz.add_question(two_answer_question(Format::Unique)).unwrap();
        let session = crate::model::Session::start(PlayerId::new(1), Arc::new(quiz), fixed_now());
        let response_id = session.responses()[0].id();

        let ok = SubmitResponseInput::new(response_id, [AnswerId::new(1)]);
        assert!(ok.validate(&session).unwrap().is_empty());

        let bad = SubmitResponseInput::new(response_id, [AnswerId::new(1), AnswerId::new(9)]);
        let violations = bad.validate(&session).unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations.to_string().contains("not part of the question"));

        let stray = SubmitResponseInput::new(ResponseId::generate(), [AnswerId::new(1)]);
        assert!(matches!(
            stray.validate(&session),
            Err(SessionStateError::UnknownResponse(_))
        ));
    }
}
