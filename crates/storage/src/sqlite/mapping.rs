use sqlx::Row;

use ielts_core::model::{
    Essay, EssayId, PromptId, QuestionType, Role, SessionId, TaskType, User, UserId,
    WritingPrompt, WritingSession,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Map an insert/update error, turning unique-constraint hits into `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn parse_task_type(s: &str) -> Result<TaskType, StorageError> {
    s.parse::<TaskType>().map_err(ser)
}

pub(crate) fn parse_question_type(s: &str) -> Result<QuestionType, StorageError> {
    s.parse::<QuestionType>().map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    let role_str: String = row.try_get("role").map_err(ser)?;
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(ser)?),
        subject: row.try_get("subject").map_err(ser)?,
        role: role_str.parse::<Role>().map_err(ser)?,
        student_id: row.try_get("student_id").map_err(ser)?,
    })
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<WritingSession, StorageError> {
    WritingSession::from_persisted(
        SessionId::new(row.try_get("id").map_err(ser)?),
        UserId::new(row.try_get("user_id").map_err(ser)?),
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed").map_err(ser)?,
        row.try_get("band_score").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_prompt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<WritingPrompt, StorageError> {
    let task_type_str: String = row.try_get("task_type").map_err(ser)?;
    Ok(WritingPrompt {
        id: PromptId::new(row.try_get("id").map_err(ser)?),
        task_type: parse_task_type(&task_type_str)?,
        prompt_text: row.try_get("prompt_text").map_err(ser)?,
        image: row.try_get("image").map_err(ser)?,
        is_active: row.try_get("is_active").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_essay_row(row: &sqlx::sqlite::SqliteRow) -> Result<Essay, StorageError> {
    let task_type_str: String = row.try_get("task_type").map_err(ser)?;
    let scores = [
        row.try_get::<Option<f64>, _>("score_task").map_err(ser)?,
        row.try_get::<Option<f64>, _>("score_coherence").map_err(ser)?,
        row.try_get::<Option<f64>, _>("score_lexical").map_err(ser)?,
        row.try_get::<Option<f64>, _>("score_grammar").map_err(ser)?,
    ];

    Essay::from_persisted(
        EssayId::new(row.try_get("id").map_err(ser)?),
        UserId::new(row.try_get("user_id").map_err(ser)?),
        row.try_get::<Option<i64>, _>("session_id")
            .map_err(ser)?
            .map(SessionId::new),
        row.try_get::<Option<i64>, _>("prompt_id")
            .map_err(ser)?
            .map(PromptId::new),
        parse_task_type(&task_type_str)?,
        row.try_get("question_text").map_err(ser)?,
        row.try_get("submitted_text").map_err(ser)?,
        row.try_get("submitted_at").map_err(ser)?,
        scores,
        row.try_get("overall_band").map_err(ser)?,
        row.try_get("feedback").map_err(ser)?,
    )
    .map_err(ser)
}
