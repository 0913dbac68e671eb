use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{PromptId, TaskType};

/// An admin-authored writing prompt.
///
/// At most one prompt per task type may be active at a time; activation is
/// enforced transactionally by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingPrompt {
    pub id: PromptId,
    pub task_type: TaskType,
    pub prompt_text: String,
    /// Path or URL of an accompanying chart/diagram image, if any.
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
