use std::collections::HashMap;

use quiz_core::model::{Answer, Question, QuestionId, Quiz, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    answer_id_from_i64, db_err, id_i64, parse_format, position_i64, question_id_from_i64, ser,
};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", quiz.id().value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
                INSERT INTO quizzes (id, title)
                VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(quiz_id)
        .bind(quiz.title())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        // answers go with their questions via ON DELETE CASCADE
        sqlx::query("DELETE FROM questions WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for (q_pos, question) in quiz.questions().iter().enumerate() {
            let question_id = id_i64("question_id", question.id().value())?;
            sqlx::query(
                r"
                    INSERT INTO questions (id, quiz_id, position, label, format)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(question_id)
            .bind(quiz_id)
            .bind(position_i64(q_pos)?)
            .bind(question.label())
            .bind(question.format().as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            for (a_pos, answer) in question.answers().iter().enumerate() {
                sqlx::query(
                    r"
                        INSERT INTO answers (quiz_id, question_id, id, position, label, good)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(quiz_id)
                .bind(question_id)
                .bind(id_i64("answer_id", answer.id().value())?)
                .bind(position_i64(a_pos)?)
                .bind(answer.label())
                .bind(answer.is_good())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(quiz_id = %quiz.id(), questions = quiz.question_count(), "Quiz stored");
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let quiz_id = id_i64("quiz_id", id.value())?;

        let title: String = sqlx::query("SELECT title FROM quizzes WHERE id = ?1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?
            .try_get("title")
            .map_err(ser)?;

        let answer_rows = sqlx::query(
            r"
                SELECT id, question_id, label, good
                FROM answers
                WHERE quiz_id = ?1
                ORDER BY question_id ASC, position ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut answers: HashMap<QuestionId, Vec<Answer>> = HashMap::new();
        for row in answer_rows {
            let question_id = question_id_from_i64(row.try_get("question_id").map_err(ser)?)?;
            let answer = Answer::new(
                answer_id_from_i64(row.try_get("id").map_err(ser)?)?,
                row.try_get::<String, _>("label").map_err(ser)?,
                row.try_get::<bool, _>("good").map_err(ser)?,
            );
            answers.entry(question_id).or_default().push(answer);
        }

        let question_rows = sqlx::query(
            r"
                SELECT id, label, format
                FROM questions
                WHERE quiz_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut quiz = Quiz::new(id, title);
        for row in question_rows {
            let question_id = question_id_from_i64(row.try_get("id").map_err(ser)?)?;
            let format = parse_format(row.try_get::<String, _>("format").map_err(ser)?.as_str())?;
            let mut question = Question::new(
                question_id,
                id,
                row.try_get::<String, _>("label").map_err(ser)?,
                format,
            );
            for answer in answers.remove(&question_id).unwrap_or_default() {
                question.add_answer(answer).map_err(ser)?;
            }
            quiz.add_question(question).map_err(ser)?;
        }

        Ok(quiz)
    }
}
