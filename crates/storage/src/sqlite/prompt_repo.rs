use ielts_core::model::{PromptId, TaskType, WritingPrompt};

use super::SqliteRepository;
use super::mapping::{conn, map_prompt_row};
use crate::repository::{NewPrompt, PromptRepository, StorageError};

const PROMPT_COLUMNS: &str = "id, task_type, prompt_text, image, is_active, created_at";

#[async_trait::async_trait]
impl PromptRepository for SqliteRepository {
    async fn insert(&self, new: NewPrompt) -> Result<WritingPrompt, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        if new.is_active {
            sqlx::query(
                "UPDATE writing_prompts SET is_active = 0 WHERE task_type = ?1 AND is_active = 1",
            )
            .bind(new.task_type.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        let result = sqlx::query(
            r"
            INSERT INTO writing_prompts (task_type, prompt_text, image, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(new.task_type.as_str())
        .bind(&new.prompt_text)
        .bind(&new.image)
        .bind(new.is_active)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(WritingPrompt {
            id: PromptId::new(result.last_insert_rowid()),
            task_type: new.task_type,
            prompt_text: new.prompt_text,
            image: new.image,
            is_active: new.is_active,
            created_at: new.created_at,
        })
    }

    async fn update(&self, prompt: &WritingPrompt) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        if prompt.is_active {
            sqlx::query(
                r"
                UPDATE writing_prompts
                SET is_active = 0
                WHERE task_type = ?1 AND id <> ?2 AND is_active = 1
                ",
            )
            .bind(prompt.task_type.as_str())
            .bind(prompt.id.value())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        let result = sqlx::query(
            r"
            UPDATE writing_prompts
            SET task_type = ?2, prompt_text = ?3, image = ?4, is_active = ?5
            WHERE id = ?1
            ",
        )
        .bind(prompt.id.value())
        .bind(prompt.task_type.as_str())
        .bind(&prompt.prompt_text)
        .bind(&prompt.image)
        .bind(prompt.is_active)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get(&self, id: PromptId) -> Result<Option<WritingPrompt>, StorageError> {
        let sql = format!("SELECT {PROMPT_COLUMNS} FROM writing_prompts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;
        row.as_ref().map(map_prompt_row).transpose()
    }

    async fn list(&self) -> Result<Vec<WritingPrompt>, StorageError> {
        let sql = format!(
            "SELECT {PROMPT_COLUMNS} FROM writing_prompts ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await.map_err(conn)?;
        rows.iter().map(map_prompt_row).collect()
    }

    async fn active_for(&self, task_type: TaskType) -> Result<Vec<WritingPrompt>, StorageError> {
        let sql = format!(
            "SELECT {PROMPT_COLUMNS} FROM writing_prompts
             WHERE task_type = ?1 AND is_active = 1
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(task_type.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;
        rows.iter().map(map_prompt_row).collect()
    }

    async fn delete(&self, id: PromptId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM writing_prompts WHERE id = ?1")
            .bind(id.value())
            .execute(self.pool())
            .await
            .map_err(conn)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
