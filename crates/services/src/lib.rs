#![forbid(unsafe_code)]

pub mod accounts;
pub mod app_services;
pub mod completion;
pub mod error;
pub mod essays;
pub mod grader;
pub mod prompts;
pub mod reading;
pub mod sessions;

pub use ielts_core::Clock;

pub use accounts::{AccountService, IdentityVerifier, StaticVerifier, VerifiedIdentity};
pub use app_services::AppServices;
pub use completion::{CompletionConfig, CompletionService, OpenAiCompletion};
pub use error::{
    AccountError, AppServicesError, CompletionError, EssayServiceError, GradingError,
    PromptServiceError, ReadingServiceError, SessionServiceError,
};
pub use essays::EssayService;
pub use grader::EssayGrader;
pub use prompts::PromptService;
pub use reading::ReadingService;
pub use sessions::{SessionStart, WritingSessionService};
