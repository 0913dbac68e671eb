mod essay;
mod ids;
mod prompt;
mod reading;
mod session;
mod user;

pub use essay::{Assessment, Essay, EssayError, RubricScores, TaskType, TaskTypeParseError};
pub use ids::{EssayId, ParseIdError, PromptId, QuestionId, ReadingTestId, SessionId, UserId};
pub use prompt::WritingPrompt;
pub use reading::{
    AnswerOption, QuestionType, QuestionTypeParseError, ReadingQuestion, ReadingTest,
    ReadingTestSummary,
};
pub use session::{SessionStateError, WritingSession};
pub use user::{Role, RoleParseError, User};
