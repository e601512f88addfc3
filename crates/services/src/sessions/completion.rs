use chrono::{DateTime, Utc};
use quiz_core::model::Session;
use storage::repository::SessionGateway;

use crate::error::QuizSessionError;

/// Finish `session` if its last outstanding response has just been answered.
///
/// The finished copy is persisted first and only then written back, so a failed
/// `finish` call leaves `session` unfinished. Returns whether the session finished.
pub(crate) async fn finish_if_complete(
    sessions: &dyn SessionGateway,
    session: &mut Session,
    at: DateTime<Utc>,
) -> Result<bool, QuizSessionError> {
    if session.is_finished() || !session.is_complete() {
        return Ok(false);
    }

    let mut finished = session.clone();
    finished.finish(at)?;
    sessions.finish(&finished).await?;
    *session = finished;

    let progress = session.progress();
    tracing::info!(
        session_id = %session.id(),
        player_id = %session.player_id(),
        valid = progress.valid,
        total = progress.total,
        "Quiz session finished"
    );
    Ok(true)
}
