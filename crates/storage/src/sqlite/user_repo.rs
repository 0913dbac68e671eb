use ielts_core::model::{Role, User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_user_row, write_err};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn get_or_create(
        &self,
        subject: &str,
        role: Role,
        student_id: Option<String>,
    ) -> Result<User, StorageError> {
        // Insert-if-absent first so two concurrent logins cannot both create.
        sqlx::query(
            r"
            INSERT INTO users (subject, role, student_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(subject) DO NOTHING
            ",
        )
        .bind(subject)
        .bind(role.as_str())
        .bind(student_id)
        .execute(self.pool())
        .await
        .map_err(write_err)?;

        let row = sqlx::query("SELECT id, subject, role, student_id FROM users WHERE subject = ?1")
            .bind(subject)
            .fetch_one(self.pool())
            .await
            .map_err(conn)?;
        map_user_row(&row)
    }

    async fn get_by_subject(&self, subject: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT id, subject, role, student_id FROM users WHERE subject = ?1")
            .bind(subject)
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn set_student_id(&self, id: UserId, student_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE users SET student_id = ?2 WHERE id = ?1")
            .bind(id.value())
            .bind(student_id)
            .execute(self.pool())
            .await
            .map_err(conn)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
