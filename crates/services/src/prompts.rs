use std::sync::Arc;

use ielts_core::Clock;
use ielts_core::model::{PromptId, TaskType, WritingPrompt};
use storage::repository::{NewPrompt, PromptRepository};

use crate::error::PromptServiceError;

/// Admin management of writing prompts.
///
/// At most one prompt per task type is active; the exclusivity rides on the
/// storage transaction, not on checks here.
#[derive(Clone)]
pub struct PromptService {
    clock: Clock,
    prompts: Arc<dyn PromptRepository>,
}

impl PromptService {
    #[must_use]
    pub fn new(clock: Clock, prompts: Arc<dyn PromptRepository>) -> Self {
        Self { clock, prompts }
    }

    /// Create a prompt. Creating it active deactivates same-type siblings.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn create(
        &self,
        task_type: TaskType,
        prompt_text: String,
        image: Option<String>,
        is_active: bool,
    ) -> Result<WritingPrompt, PromptServiceError> {
        Ok(self
            .prompts
            .insert(NewPrompt {
                task_type,
                prompt_text,
                image,
                is_active,
                created_at: self.clock.now(),
            })
            .await?)
    }

    /// Overwrite a prompt. Activating it deactivates same-type siblings.
    ///
    /// # Errors
    ///
    /// `PromptNotFound` when the id does not exist.
    pub async fn update(&self, prompt: &WritingPrompt) -> Result<(), PromptServiceError> {
        self.prompts.update(prompt).await.map_err(|err| match err {
            storage::repository::StorageError::NotFound => PromptServiceError::PromptNotFound,
            other => other.into(),
        })
    }

    /// One prompt by id.
    ///
    /// # Errors
    ///
    /// `PromptNotFound` when the id does not exist.
    pub async fn get(&self, id: PromptId) -> Result<WritingPrompt, PromptServiceError> {
        self.prompts
            .get(id)
            .await?
            .ok_or(PromptServiceError::PromptNotFound)
    }

    /// All prompts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn list(&self) -> Result<Vec<WritingPrompt>, PromptServiceError> {
        Ok(self.prompts.list().await?)
    }

    /// The active prompt for a task type, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn active_for(
        &self,
        task_type: TaskType,
    ) -> Result<Option<WritingPrompt>, PromptServiceError> {
        Ok(self.prompts.active_for(task_type).await?.into_iter().next())
    }

    /// Delete a prompt.
    ///
    /// # Errors
    ///
    /// `PromptNotFound` when the id does not exist.
    pub async fn delete(&self, id: PromptId) -> Result<(), PromptServiceError> {
        self.prompts.delete(id).await.map_err(|err| match err {
            storage::repository::StorageError::NotFound => PromptServiceError::PromptNotFound,
            other => other.into(),
        })
    }
}
