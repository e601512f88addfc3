use std::collections::HashMap;

use quiz_core::model::{ResponseId, Session, SessionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    answer_id_from_i64, db_err, id_i64, player_id_from_i64, position_i64, question_id_from_i64,
    quiz_id_from_i64, response_id_from_str, ser,
};
use crate::repository::{ResponseRecord, SessionGateway, SessionRecord, StorageError};

impl SqliteRepository {
    async fn session_exists(&self, id: SessionId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM quiz_sessions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl SessionGateway for SqliteRepository {
    async fn start(&self, session: &Session) -> Result<(), StorageError> {
        let session_id = session.id().to_string();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
                INSERT INTO quiz_sessions (id, player_id, quiz_id, started_at, finished_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(&session_id)
        .bind(id_i64("player_id", session.player_id().value())?)
        .bind(id_i64("quiz_id", session.quiz().id().value())?)
        .bind(session.started_at())
        .bind(session.finished_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for (pos, response) in session.responses().iter().enumerate() {
            let response_id = response.id().to_string();
            sqlx::query(
                r"
                    INSERT INTO responses (
                        id, session_id, question_id, position, valid, responded_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(&response_id)
            .bind(&session_id)
            .bind(id_i64("question_id", response.question_id().value())?)
            .bind(position_i64(pos)?)
            .bind(response.is_valid())
            .bind(response.responded_at())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(session_id = %session.id(), "Session row inserted");
        Ok(())
    }

    async fn finish(&self, session: &Session) -> Result<(), StorageError> {
        let finished_at = session
            .finished_at()
            .ok_or_else(|| StorageError::Serialization("session has no finished_at".into()))?;

        // Only an unfinished session whose responses are all answered may finish.
        let res = sqlx::query(
            r"
                UPDATE quiz_sessions
                SET finished_at = ?2
                WHERE id = ?1
                  AND finished_at IS NULL
                  AND NOT EXISTS (
                      SELECT 1 FROM responses
                      WHERE session_id = ?1 AND responded_at IS NULL
                  )
            ",
        )
        .bind(session.id().to_string())
        .bind(finished_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            if self.session_exists(session.id()).await? {
                tracing::warn!(session_id = %session.id(), "Session finish conflict");
                return Err(StorageError::Conflict);
            }
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let session_id = id.to_string();

        let row = sqlx::query(
            r"
                SELECT player_id, quiz_id, started_at, finished_at
                FROM quiz_sessions
                WHERE id = ?1
            ",
        )
        .bind(&session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        let selection_rows = sqlx::query(
            r"
                SELECT ra.response_id, ra.answer_id
                FROM response_answers ra
                JOIN responses r ON r.id = ra.response_id
                WHERE r.session_id = ?1
                ORDER BY ra.response_id ASC, ra.position ASC
            ",
        )
        .bind(&session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut selections: HashMap<ResponseId, Vec<_>> = HashMap::new();
        for sel in selection_rows {
            let response_id =
                response_id_from_str(sel.try_get::<String, _>("response_id").map_err(ser)?.as_str())?;
            let answer_id = answer_id_from_i64(sel.try_get("answer_id").map_err(ser)?)?;
            selections.entry(response_id).or_default().push(answer_id);
        }

        let response_rows = sqlx::query(
            r"
                SELECT id, question_id, valid, responded_at
                FROM responses
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(&session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut responses = Vec::with_capacity(response_rows.len());
        for r in response_rows {
            let response_id =
                response_id_from_str(r.try_get::<String, _>("id").map_err(ser)?.as_str())?;
            responses.push(ResponseRecord {
                id: response_id,
                question_id: question_id_from_i64(r.try_get("question_id").map_err(ser)?)?,
                answers: selections.remove(&response_id).unwrap_or_default(),
                valid: r.try_get("valid").map_err(ser)?,
                responded_at: r.try_get("responded_at").map_err(ser)?,
            });
        }

        Ok(SessionRecord {
            id,
            player_id: player_id_from_i64(row.try_get("player_id").map_err(ser)?)?,
            quiz_id: quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?,
            started_at: row.try_get("started_at").map_err(ser)?,
            finished_at: row.try_get("finished_at").map_err(ser)?,
            responses,
        })
    }
}
