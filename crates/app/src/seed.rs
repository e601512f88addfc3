use quiz_core::model::{Answer, AnswerId, Format, Question, QuestionId, Quiz, QuizError, QuizId};

/// (prompt, format, answers as (label, good))
type SampleQuestion = (&'static str, Format, &'static [(&'static str, bool)]);

const SAMPLE: &[SampleQuestion] = &[
    (
        "Which planet is the largest?",
        Format::Unique,
        &[("Mars", false), ("Jupiter", true), ("Venus", false)],
    ),
    (
        "Which of these are gas giants?",
        Format::Multiple,
        &[("Saturn", true), ("Mercury", false), ("Neptune", true)],
    ),
    (
        "How many moons does Earth have?",
        Format::Unique,
        &[("One", true), ("Two", false), ("None", false)],
    ),
];

/// Build the sample quiz stored by `seed`.
pub(crate) fn sample_quiz(quiz_id: QuizId) -> Result<Quiz, QuizError> {
    let mut quiz = Quiz::new(quiz_id, "Solar system");
    for (q, (label, format, answers)) in (1_u64..).zip(SAMPLE) {
        let mut question = Question::new(QuestionId::new(q), quiz_id, *label, *format);
        for (a, (answer, good)) in (1_u64..).zip(answers.iter()) {
            question.add_answer(Answer::new(AnswerId::new(a), *answer, *good))?;
        }
        quiz.add_question(question)?;
    }
    Ok(quiz)
}
