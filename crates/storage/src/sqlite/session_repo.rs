use chrono::{DateTime, Utc};
use ielts_core::model::{SessionId, UserId, WritingSession};

use super::SqliteRepository;
use super::mapping::{conn, map_session_row};
use crate::repository::{SessionRepository, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create(
        &self,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<WritingSession, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO writing_sessions (user_id, started_at, completed, band_score)
            VALUES (?1, ?2, 0, NULL)
            ",
        )
        .bind(user_id.value())
        .bind(started_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(WritingSession::new(
            SessionId::new(result.last_insert_rowid()),
            user_id,
            started_at,
        ))
    }

    async fn get(&self, id: SessionId) -> Result<Option<WritingSession>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, started_at, completed, band_score
            FROM writing_sessions
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn complete(&self, id: SessionId, band_score: f64) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE writing_sessions
            SET completed = 1, band_score = ?2
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .bind(band_score)
        .execute(self.pool())
        .await
        .map_err(conn)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
