use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            quiz_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            label TEXT NOT NULL,
            format TEXT NOT NULL CHECK (format IN ('unique', 'multiple')),
            PRIMARY KEY (quiz_id, id),
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS answers (
            quiz_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            label TEXT NOT NULL,
            good INTEGER NOT NULL CHECK (good IN (0, 1)),
            PRIMARY KEY (quiz_id, question_id, id),
            FOREIGN KEY (quiz_id, question_id)
                REFERENCES questions(quiz_id, id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_sessions (
            id TEXT PRIMARY KEY,
            player_id INTEGER NOT NULL,
            quiz_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            question_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            valid INTEGER NOT NULL DEFAULT 0 CHECK (valid IN (0, 1)),
            responded_at TEXT,
            UNIQUE (session_id, question_id),
            FOREIGN KEY (session_id) REFERENCES quiz_sessions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS response_answers (
            response_id TEXT NOT NULL,
            answer_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            PRIMARY KEY (response_id, answer_id),
            FOREIGN KEY (response_id) REFERENCES responses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_quiz_position
            ON questions (quiz_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_responses_session_position
            ON responses (session_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_sessions_player
            ON quiz_sessions (player_id, started_at);
    ",
];

/// Runs the versioned schema migrations.
///
/// Version 1 creates quiz content tables (quizzes, questions, answers) and
/// session tables (quiz_sessions, responses, response_answers).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "Applied schema migration");
    }

    Ok(())
}
