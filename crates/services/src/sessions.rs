use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{info, warn};

use ielts_core::Clock;
use ielts_core::model::{
    EssayError, SessionId, TaskType, UserId, WritingPrompt, WritingSession,
};
use ielts_core::scoring::round_band;
use storage::repository::{
    EssayRepository, NewEssay, PromptRepository, SessionRepository, StorageError,
};

use crate::error::SessionServiceError;
use crate::grader::EssayGrader;

/// A freshly started session together with the prompts drawn for it.
///
/// A task type with no active prompt yields `None`; the caller decides how
/// to present the absence.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session: WritingSession,
    pub task1: Option<WritingPrompt>,
    pub task2: Option<WritingPrompt>,
}

/// The two-task writing test workflow: start, submit each task, finish.
#[derive(Clone)]
pub struct WritingSessionService {
    clock: Clock,
    grader: EssayGrader,
    sessions: Arc<dyn SessionRepository>,
    essays: Arc<dyn EssayRepository>,
    prompts: Arc<dyn PromptRepository>,
}

impl WritingSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        grader: EssayGrader,
        sessions: Arc<dyn SessionRepository>,
        essays: Arc<dyn EssayRepository>,
        prompts: Arc<dyn PromptRepository>,
    ) -> Self {
        Self {
            clock,
            grader,
            sessions,
            essays,
            prompts,
        }
    }

    /// Start a session and draw one active prompt per task type.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` on repository failures.
    pub async fn start(&self, user_id: UserId) -> Result<SessionStart, SessionServiceError> {
        let session = self.sessions.create(user_id, self.clock.now()).await?;

        let task1 = pick_random(self.prompts.active_for(TaskType::Task1).await?);
        let task2 = pick_random(self.prompts.active_for(TaskType::Task2).await?);
        if task1.is_none() {
            warn!(session_id = %session.id(), "no active task1 prompt");
        }
        if task2.is_none() {
            warn!(session_id = %session.id(), "no active task2 prompt");
        }

        Ok(SessionStart {
            session,
            task1,
            task2,
        })
    }

    /// Record one task submission within a session.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for an unknown session, `DuplicateSubmission` when
    /// the task type was already submitted, `Essay` when the question or the
    /// submission is blank.
    pub async fn submit_task(
        &self,
        session_id: SessionId,
        task_type: TaskType,
        question_text: String,
        submitted_text: String,
    ) -> Result<(), SessionServiceError> {
        if submitted_text.trim().is_empty() {
            return Err(EssayError::EmptySubmission.into());
        }
        if question_text.trim().is_empty() {
            return Err(EssayError::EmptyQuestion.into());
        }
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(SessionServiceError::SessionNotFound)?;

        let insert = self
            .essays
            .insert(NewEssay {
                user_id: session.user_id(),
                session_id: Some(session_id),
                prompt_id: None,
                task_type,
                question_text,
                submitted_text,
                submitted_at: self.clock.now(),
            })
            .await;

        match insert {
            Ok(_) => Ok(()),
            Err(StorageError::Conflict) => {
                Err(SessionServiceError::DuplicateSubmission(task_type))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Grade the session's essays and complete it.
    ///
    /// Each assessment is persisted as soon as it is produced, so a grading
    /// failure part-way through leaves earlier work in place and a retry
    /// grades only what is still ungraded. Finishing an already-completed
    /// session returns it unchanged.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for an unknown session, `IncompleteSession` when
    /// fewer than two essays exist, `Grading` when the examiner call fails.
    pub async fn finish(
        &self,
        session_id: SessionId,
    ) -> Result<WritingSession, SessionServiceError> {
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(SessionServiceError::SessionNotFound)?;
        if session.is_completed() {
            return Ok(session);
        }

        let mut essays = self.essays.for_session(session_id).await?;
        if essays.len() < 2 {
            return Err(SessionServiceError::IncompleteSession);
        }

        for essay in &mut essays {
            if essay.is_graded() {
                continue;
            }
            let assessment = self
                .grader
                .grade(essay.question_text(), essay.submitted_text())
                .await?;
            self.essays.save_assessment(essay.id(), &assessment).await?;
            essay.apply_assessment(assessment);
        }

        let bands: Vec<f64> = essays.iter().filter_map(|essay| essay.overall_band()).collect();
        // Every essay was just graded, so the sum covers them all.
        let mean = bands.iter().sum::<f64>() / bands.len() as f64;
        let band_score = round_band(mean);

        self.sessions.complete(session_id, band_score).await?;
        session.complete(band_score)?;
        info!(session_id = %session_id, band_score, "writing session completed");
        Ok(session)
    }
}

fn pick_random(prompts: Vec<WritingPrompt>) -> Option<WritingPrompt> {
    let mut rng = rand::rng();
    prompts.choose(&mut rng).cloned()
}
