use quiz_core::model::{AnswerId, Format, PlayerId, QuestionId, QuizId, ResponseId};
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map a driver error, keeping constraint failures distinguishable.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    Ok(PlayerId::new(i64_to_u64("player_id", v)?))
}

// Session and response ids are stored as hyphenated UUID text; the session
// id is only ever bound, never read back.
pub(crate) fn response_id_from_str(s: &str) -> Result<ResponseId, StorageError> {
    Uuid::parse_str(s).map(ResponseId::from_uuid).map_err(ser)
}

pub(crate) fn parse_format(s: &str) -> Result<Format, StorageError> {
    s.parse::<Format>().map_err(ser)
}

pub(crate) fn position_i64(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index).map_err(|_| StorageError::Serialization("position overflow".into()))
}
