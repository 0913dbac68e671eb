use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{EssayId, PromptId, SessionId, UserId};
use crate::scoring::round_band;

/// The two IELTS writing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Task1,
    Task2,
}

impl TaskType {
    pub const ALL: [TaskType; 2] = [TaskType::Task1, TaskType::Task2];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Task1 => "task1",
            TaskType::Task2 => "task2",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid task type: {raw}")]
pub struct TaskTypeParseError {
    pub raw: String,
}

impl FromStr for TaskType {
    type Err = TaskTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task1" => Ok(TaskType::Task1),
            "task2" => Ok(TaskType::Task2),
            _ => Err(TaskTypeParseError { raw: s.to_owned() }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EssayError {
    #[error("submitted text must not be empty")]
    EmptySubmission,

    #[error("question text must not be empty")]
    EmptyQuestion,

    #[error("persisted grading fields are partially set")]
    PartialAssessment,
}

/// The four rubric scores returned by the examiner, each on the 0-9 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricScores {
    pub task_response: f64,
    pub coherence_cohesion: f64,
    pub lexical_resource: f64,
    pub grammar: f64,
}

impl RubricScores {
    /// Arithmetic mean of the four rubric scores.
    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.task_response + self.coherence_cohesion + self.lexical_resource + self.grammar) / 4.0
    }
}

/// Grading outcome for a single essay.
///
/// Bundling scores, overall band, and feedback into one value keeps the
/// "all graded fields set together" invariant structural: an essay either has
/// no assessment or a complete one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    scores: RubricScores,
    overall_band: f64,
    feedback: String,
}

impl Assessment {
    /// Build an assessment, deriving the overall band from the rubric mean.
    #[must_use]
    pub fn new(scores: RubricScores, feedback: String) -> Self {
        let overall_band = round_band(scores.mean());
        Self {
            scores,
            overall_band,
            feedback,
        }
    }

    /// Rehydrate an assessment exactly as stored, without re-deriving the band.
    #[must_use]
    pub fn from_persisted(scores: RubricScores, overall_band: f64, feedback: String) -> Self {
        Self {
            scores,
            overall_band,
            feedback,
        }
    }

    #[must_use]
    pub fn scores(&self) -> &RubricScores {
        &self.scores
    }

    #[must_use]
    pub fn overall_band(&self) -> f64 {
        self.overall_band
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

/// A submitted writing-task essay, graded or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Essay {
    id: EssayId,
    user_id: UserId,
    session_id: Option<SessionId>,
    prompt_id: Option<PromptId>,
    task_type: TaskType,
    question_text: String,
    submitted_text: String,
    submitted_at: DateTime<Utc>,
    assessment: Option<Assessment>,
}

impl Essay {
    /// Create a fresh, ungraded essay.
    ///
    /// # Errors
    ///
    /// Returns `EssayError::EmptySubmission` if the submitted text is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EssayId,
        user_id: UserId,
        session_id: Option<SessionId>,
        prompt_id: Option<PromptId>,
        task_type: TaskType,
        question_text: String,
        submitted_text: String,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, EssayError> {
        if submitted_text.trim().is_empty() {
            return Err(EssayError::EmptySubmission);
        }
        Ok(Self {
            id,
            user_id,
            session_id,
            prompt_id,
            task_type,
            question_text,
            submitted_text,
            submitted_at,
            assessment: None,
        })
    }

    /// Rehydrate an essay from persisted storage.
    ///
    /// The four rubric scores, the overall band, and the feedback must be
    /// either all present (graded) or all absent (ungraded).
    ///
    /// # Errors
    ///
    /// Returns `EssayError::PartialAssessment` if only some grading fields
    /// are set.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: EssayId,
        user_id: UserId,
        session_id: Option<SessionId>,
        prompt_id: Option<PromptId>,
        task_type: TaskType,
        question_text: String,
        submitted_text: String,
        submitted_at: DateTime<Utc>,
        scores: [Option<f64>; 4],
        overall_band: Option<f64>,
        feedback: Option<String>,
    ) -> Result<Self, EssayError> {
        let assessment = match (scores, overall_band, feedback) {
            ([None, None, None, None], None, None) => None,
            ([Some(task), Some(coherence), Some(lexical), Some(grammar)], Some(band), Some(fb)) => {
                Some(Assessment::from_persisted(
                    RubricScores {
                        task_response: task,
                        coherence_cohesion: coherence,
                        lexical_resource: lexical,
                        grammar,
                    },
                    band,
                    fb,
                ))
            }
            _ => return Err(EssayError::PartialAssessment),
        };

        Ok(Self {
            id,
            user_id,
            session_id,
            prompt_id,
            task_type,
            question_text,
            submitted_text,
            submitted_at,
            assessment,
        })
    }

    #[must_use]
    pub fn id(&self) -> EssayId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn prompt_id(&self) -> Option<PromptId> {
        self.prompt_id
    }

    #[must_use]
    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    #[must_use]
    pub fn submitted_text(&self) -> &str {
        &self.submitted_text
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.assessment.is_some()
    }

    #[must_use]
    pub fn overall_band(&self) -> Option<f64> {
        self.assessment.as_ref().map(Assessment::overall_band)
    }

    /// Attach a grading outcome to this essay.
    pub fn apply_assessment(&mut self, assessment: Assessment) {
        self.assessment = Some(assessment);
    }
}
