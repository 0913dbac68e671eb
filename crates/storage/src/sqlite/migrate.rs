use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: users, writing sessions, prompts, essays, reading
/// tests with questions/options/keys, and indexes.
#[allow(clippy::too_many_lines)]
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

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY,
                    subject TEXT NOT NULL UNIQUE,
                    role TEXT NOT NULL CHECK (role IN ('student', 'admin')),
                    student_id TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS writing_sessions (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    band_score REAL,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS writing_prompts (
                    id INTEGER PRIMARY KEY,
                    task_type TEXT NOT NULL CHECK (task_type IN ('task1', 'task2')),
                    prompt_text TEXT NOT NULL,
                    image TEXT,
                    is_active INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS essays (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    session_id INTEGER,
                    prompt_id INTEGER,
                    task_type TEXT NOT NULL CHECK (task_type IN ('task1', 'task2')),
                    question_text TEXT NOT NULL,
                    submitted_text TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    score_task REAL,
                    score_coherence REAL,
                    score_lexical REAL,
                    score_grammar REAL,
                    overall_band REAL,
                    feedback TEXT,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                    FOREIGN KEY (session_id) REFERENCES writing_sessions(id) ON DELETE CASCADE,
                    FOREIGN KEY (prompt_id) REFERENCES writing_prompts(id) ON DELETE SET NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // One essay per (session, task type); backs the duplicate-submission
        // check so concurrent submits cannot both pass it.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_essays_session_task
                    ON essays (session_id, task_type)
                    WHERE session_id IS NOT NULL;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reading_tests (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reading_questions (
                    id INTEGER PRIMARY KEY,
                    test_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    question_type TEXT NOT NULL CHECK (question_type IN (
                        'MULTIPLE_CHOICE', 'TRUE_FALSE_NOT_GIVEN', 'MATCHING_HEADINGS'
                    )),
                    question_text TEXT NOT NULL,
                    paragraph_ref TEXT NOT NULL DEFAULT '',
                    FOREIGN KEY (test_id) REFERENCES reading_tests(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_options (
                    id INTEGER PRIMARY KEY,
                    question_id INTEGER NOT NULL,
                    label TEXT NOT NULL,
                    text TEXT NOT NULL,
                    FOREIGN KEY (question_id) REFERENCES reading_questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_keys (
                    question_id INTEGER PRIMARY KEY,
                    correct_answer TEXT NOT NULL,
                    FOREIGN KEY (question_id) REFERENCES reading_questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_essays_user_submitted
                    ON essays (user_id, submitted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_essays_session
                    ON essays (session_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_test_position
                    ON reading_questions (test_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_prompts_type_active
                    ON writing_prompts (task_type, is_active);
            ",
        )
        .execute(&mut *tx)
        .await?;

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
    }

    Ok(())
}
