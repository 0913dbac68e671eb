//! Shared error types for the services crate.

use thiserror::Error;

use ielts_core::model::{EssayError, SessionStateError, TaskType};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by completion clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("completion service is not configured")]
    Disabled,
    #[error("completion service returned an empty response")]
    EmptyResponse,
    #[error("completion request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `EssayGrader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Errors emitted by `WritingSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("session not found")]
    SessionNotFound,
    #[error("{0} was already submitted for this session")]
    DuplicateSubmission(TaskType),
    #[error("a session needs both tasks before it can be finished")]
    IncompleteSession,
    #[error(transparent)]
    Essay(#[from] EssayError),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EssayService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EssayServiceError {
    #[error("essay not found")]
    EssayNotFound,
    #[error(transparent)]
    Essay(#[from] EssayError),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReadingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadingServiceError {
    #[error("reading test not found")]
    TestNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PromptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PromptServiceError {
    #[error("prompt not found")]
    PromptNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("identity verification failed")]
    Unverified,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
