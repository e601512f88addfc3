use quiz_core::model::Response;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, position_i64};
use crate::repository::{ResponseGateway, StorageError};

#[async_trait::async_trait]
impl ResponseGateway for SqliteRepository {
    async fn submit(&self, response: &Response) -> Result<(), StorageError> {
        let responded_at = response
            .responded_at()
            .ok_or_else(|| StorageError::Serialization("response has no responded_at".into()))?;
        let response_id = response.id().to_string();
        let session_id = response.session_id().to_string();

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The NULL guard makes a second submission lose instead of double-scoring.
        let res = sqlx::query(
            r"
                UPDATE responses
                SET valid = ?3, responded_at = ?4
                WHERE id = ?1 AND session_id = ?2 AND responded_at IS NULL
            ",
        )
        .bind(&response_id)
        .bind(&session_id)
        .bind(response.is_valid())
        .bind(responded_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM responses WHERE id = ?1 AND session_id = ?2")
                .bind(&response_id)
                .bind(&session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .is_some();
            if exists {
                tracing::warn!(response_id = %response.id(), "Response submit conflict");
                return Err(StorageError::Conflict);
            }
            return Err(StorageError::NotFound);
        }

        for (pos, answer_id) in response.answers().iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO response_answers (response_id, answer_id, position)
                    VALUES (?1, ?2, ?3)
                ",
            )
            .bind(&response_id)
            .bind(id_i64("answer_id", answer_id.value())?)
            .bind(position_i64(pos)?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
