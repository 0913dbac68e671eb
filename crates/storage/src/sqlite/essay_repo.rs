use sqlx::Row;

use ielts_core::model::{Assessment, Essay, EssayId, Role, SessionId, User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_essay_row, ser, write_err};
use crate::repository::{EssayRepository, NewEssay, StorageError};

const ESSAY_COLUMNS: &str = r"
    id, user_id, session_id, prompt_id, task_type, question_text, submitted_text,
    submitted_at, score_task, score_coherence, score_lexical, score_grammar,
    overall_band, feedback
";

#[async_trait::async_trait]
impl EssayRepository for SqliteRepository {
    async fn insert(&self, new: NewEssay) -> Result<Essay, StorageError> {
        // The partial unique index on (session_id, task_type) turns a
        // concurrent duplicate submit into a Conflict here.
        let result = sqlx::query(
            r"
            INSERT INTO essays (
                user_id, session_id, prompt_id, task_type,
                question_text, submitted_text, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(new.user_id.value())
        .bind(new.session_id.map(|id| id.value()))
        .bind(new.prompt_id.map(|id| id.value()))
        .bind(new.task_type.as_str())
        .bind(&new.question_text)
        .bind(&new.submitted_text)
        .bind(new.submitted_at)
        .execute(self.pool())
        .await
        .map_err(write_err)?;

        Essay::new(
            EssayId::new(result.last_insert_rowid()),
            new.user_id,
            new.session_id,
            new.prompt_id,
            new.task_type,
            new.question_text,
            new.submitted_text,
            new.submitted_at,
        )
        .map_err(ser)
    }

    async fn get(&self, id: EssayId) -> Result<Option<Essay>, StorageError> {
        let sql = format!("SELECT {ESSAY_COLUMNS} FROM essays WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;
        row.as_ref().map(map_essay_row).transpose()
    }

    async fn for_session(&self, session_id: SessionId) -> Result<Vec<Essay>, StorageError> {
        let sql = format!(
            "SELECT {ESSAY_COLUMNS} FROM essays WHERE session_id = ?1 ORDER BY task_type, id"
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.value())
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;
        rows.iter().map(map_essay_row).collect()
    }

    async fn for_user(
        &self,
        user_id: UserId,
        session_id: Option<SessionId>,
    ) -> Result<Vec<Essay>, StorageError> {
        let rows = match session_id {
            Some(session_id) => {
                let sql = format!(
                    "SELECT {ESSAY_COLUMNS} FROM essays
                     WHERE user_id = ?1 AND session_id = ?2
                     ORDER BY submitted_at DESC, id DESC"
                );
                sqlx::query(&sql)
                    .bind(user_id.value())
                    .bind(session_id.value())
                    .fetch_all(self.pool())
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {ESSAY_COLUMNS} FROM essays
                     WHERE user_id = ?1
                     ORDER BY submitted_at DESC, id DESC"
                );
                sqlx::query(&sql).bind(user_id.value()).fetch_all(self.pool()).await
            }
        }
        .map_err(conn)?;
        rows.iter().map(map_essay_row).collect()
    }

    async fn list_recent(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<(Essay, User)>, StorageError> {
        let base = r"
            SELECT
                e.id, e.user_id, e.session_id, e.prompt_id, e.task_type,
                e.question_text, e.submitted_text, e.submitted_at,
                e.score_task, e.score_coherence, e.score_lexical, e.score_grammar,
                e.overall_band, e.feedback,
                u.id AS author_id, u.subject AS author_subject,
                u.role AS author_role, u.student_id AS author_student_id
            FROM essays e
            JOIN users u ON u.id = e.user_id
        ";
        let rows = match student_id {
            Some(filter) => {
                let sql =
                    format!("{base} WHERE u.student_id = ?1 ORDER BY e.submitted_at DESC, e.id DESC");
                sqlx::query(&sql).bind(filter).fetch_all(self.pool()).await
            }
            None => {
                let sql = format!("{base} ORDER BY e.submitted_at DESC, e.id DESC");
                sqlx::query(&sql).fetch_all(self.pool()).await
            }
        }
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let essay = map_essay_row(row)?;
                let role_str: String = row.try_get("author_role").map_err(ser)?;
                let user = User {
                    id: UserId::new(row.try_get("author_id").map_err(ser)?),
                    subject: row.try_get("author_subject").map_err(ser)?,
                    role: role_str.parse::<Role>().map_err(ser)?,
                    student_id: row.try_get("author_student_id").map_err(ser)?,
                };
                Ok((essay, user))
            })
            .collect()
    }

    async fn save_assessment(
        &self,
        id: EssayId,
        assessment: &Assessment,
    ) -> Result<(), StorageError> {
        let scores = assessment.scores();
        let result = sqlx::query(
            r"
            UPDATE essays
            SET score_task = ?2,
                score_coherence = ?3,
                score_lexical = ?4,
                score_grammar = ?5,
                overall_band = ?6,
                feedback = ?7
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .bind(scores.task_response)
        .bind(scores.coherence_cohesion)
        .bind(scores.lexical_resource)
        .bind(scores.grammar)
        .bind(assessment.overall_band())
        .bind(assessment.feedback())
        .execute(self.pool())
        .await
        .map_err(conn)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
