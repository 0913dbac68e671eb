use std::sync::Arc;

use ielts_core::Clock;
use ielts_core::model::{Essay, EssayError, EssayId, SessionId, TaskType, User, UserId};
use storage::repository::{EssayRepository, NewEssay};

use crate::error::EssayServiceError;
use crate::grader::EssayGrader;

/// Standalone essay submission and listings.
#[derive(Clone)]
pub struct EssayService {
    clock: Clock,
    grader: EssayGrader,
    essays: Arc<dyn EssayRepository>,
}

impl EssayService {
    #[must_use]
    pub fn new(clock: Clock, grader: EssayGrader, essays: Arc<dyn EssayRepository>) -> Self {
        Self {
            clock,
            grader,
            essays,
        }
    }

    /// Submit an essay outside any session and grade it immediately.
    ///
    /// The essay is persisted before grading; if the examiner call fails the
    /// submission survives ungraded and the error propagates.
    ///
    /// # Errors
    ///
    /// `Essay` for a blank submission, `Grading` when the examiner call
    /// fails, `Storage` on repository failures.
    pub async fn submit(
        &self,
        user_id: UserId,
        task_type: TaskType,
        question_text: String,
        submitted_text: String,
    ) -> Result<Essay, EssayServiceError> {
        if submitted_text.trim().is_empty() {
            return Err(EssayError::EmptySubmission.into());
        }
        let mut essay = self
            .essays
            .insert(NewEssay {
                user_id,
                session_id: None,
                prompt_id: None,
                task_type,
                question_text,
                submitted_text,
                submitted_at: self.clock.now(),
            })
            .await?;

        let assessment = self
            .grader
            .grade(essay.question_text(), essay.submitted_text())
            .await?;
        self.essays.save_assessment(essay.id(), &assessment).await?;
        essay.apply_assessment(assessment);
        Ok(essay)
    }

    /// One essay by id.
    ///
    /// # Errors
    ///
    /// `EssayNotFound` when the id does not exist.
    pub async fn get(&self, id: EssayId) -> Result<Essay, EssayServiceError> {
        self.essays
            .get(id)
            .await?
            .ok_or(EssayServiceError::EssayNotFound)
    }

    /// A user's essays, newest first, optionally restricted to one session.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        session_id: Option<SessionId>,
    ) -> Result<Vec<Essay>, EssayServiceError> {
        Ok(self.essays.for_user(user_id, session_id).await?)
    }

    /// All essays with their authors, newest first, optionally filtered by
    /// student id. Admin listing.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn list_recent(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<(Essay, User)>, EssayServiceError> {
        Ok(self.essays.list_recent(student_id).await?)
    }
}
