use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question {question} already contains answer {answer}")]
    DuplicateAnswer {
        question: QuestionId,
        answer: AnswerId,
    },

    #[error("quiz {quiz} already contains question {question}")]
    DuplicateQuestion { quiz: QuizId, question: QuestionId },

    #[error("question {question} belongs to quiz {actual}, not {expected}")]
    ForeignQuestion {
        question: QuestionId,
        expected: QuizId,
        actual: QuizId,
    },

    #[error("invalid format value: {0}")]
    InvalidFormat(String),
}

//
// ─── FORMAT ────────────────────────────────────────────────────────────────────
//

/// How many answers a response to a question may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Exactly one answer.
    Unique,
    /// One or more answers.
    Multiple,
}

impl Format {
    /// Stable storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Unique => "unique",
            Format::Multiple => "multiple",
        }
    }

    /// Returns true if `count` selected answers satisfy this format.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Format::Unique => count == 1,
            Format::Multiple => count >= 1,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique" => Ok(Format::Unique),
            "multiple" => Ok(Format::Multiple),
            other => Err(QuizError::InvalidFormat(other.to_owned())),
        }
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    id: AnswerId,
    label: String,
    good: bool,
}

impl Answer {
    #[must_use]
    pub fn new(id: AnswerId, label: impl Into<String>, good: bool) -> Self {
        Self {
            id,
            label: label.into(),
            good,
        }
    }

    #[must_use]
    pub fn id(&self) -> AnswerId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this answer is a correct choice.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.good
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One item of a quiz, owning its answers in authoring order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    quiz_id: QuizId,
    label: String,
    format: Format,
    answers: Vec<Answer>,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, quiz_id: QuizId, label: impl Into<String>, format: Format) -> Self {
        Self {
            id,
            quiz_id,
            label: label.into(),
            format,
            answers: Vec::new(),
        }
    }

    /// Append an answer.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::DuplicateAnswer` if an answer with the same id exists.
    pub fn add_answer(&mut self, answer: Answer) -> Result<(), QuizError> {
        if self.contains_answer(answer.id()) {
            return Err(QuizError::DuplicateAnswer {
                question: self.id,
                answer: answer.id(),
            });
        }
        self.answers.push(answer);
        Ok(())
    }

    /// Builder-style variant of [`Question::add_answer`].
    ///
    /// # Errors
    ///
    /// Returns `QuizError::DuplicateAnswer` if an answer with the same id exists.
    pub fn with_answer(mut self, answer: Answer) -> Result<Self, QuizError> {
        self.add_answer(answer)?;
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn contains_answer(&self, id: AnswerId) -> bool {
        self.answer(id).is_some()
    }

    /// Ids of every answer flagged good.
    #[must_use]
    pub fn good_answer_ids(&self) -> BTreeSet<AnswerId> {
        self.answers
            .iter()
            .filter(|a| a.good)
            .map(|a| a.id)
            .collect()
    }

    /// A selection is correct when it is exactly the set of good answers.
    #[must_use]
    pub fn is_correct_selection(&self, selected: &[AnswerId]) -> bool {
        let selected: BTreeSet<AnswerId> = selected.iter().copied().collect();
        selected == self.good_answer_ids()
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Authored quiz content: an ordered list of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn new(id: QuizId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            questions: Vec::new(),
        }
    }

    /// Append a question, keeping enumeration order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ForeignQuestion` if the question points at another quiz,
    /// or `QuizError::DuplicateQuestion` if its id is already present.
    pub fn add_question(&mut self, question: Question) -> Result<(), QuizError> {
        if question.quiz_id() != self.id {
            return Err(QuizError::ForeignQuestion {
                question: question.id(),
                expected: self.id,
                actual: question.quiz_id(),
            });
        }
        if self.question(question.id()).is_some() {
            return Err(QuizError::DuplicateQuestion {
                quiz: self.id,
                question: question.id(),
            });
        }
        self.questions.push(question);
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
