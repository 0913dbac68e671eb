use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use services::{
    AccountError, EssayServiceError, PromptServiceError, ReadingServiceError, SessionServiceError,
};

/// HTTP-facing error: every variant maps to a status and an
/// `{"error": "..."}` body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    BadGateway(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication failed".into()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "admin access required".into()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Unverified => ApiError::Unauthorized,
            other => internal(&other),
        }
    }
}

impl From<SessionServiceError> for ApiError {
    fn from(err: SessionServiceError) -> Self {
        match err {
            SessionServiceError::SessionNotFound => ApiError::NotFound(err.to_string()),
            SessionServiceError::DuplicateSubmission(_)
            | SessionServiceError::IncompleteSession
            | SessionServiceError::Essay(_) => ApiError::BadRequest(err.to_string()),
            SessionServiceError::Grading(grading) => ApiError::BadGateway(grading.to_string()),
            other => internal(&other),
        }
    }
}

impl From<EssayServiceError> for ApiError {
    fn from(err: EssayServiceError) -> Self {
        match err {
            EssayServiceError::EssayNotFound => ApiError::NotFound(err.to_string()),
            EssayServiceError::Essay(_) => ApiError::BadRequest(err.to_string()),
            EssayServiceError::Grading(grading) => ApiError::BadGateway(grading.to_string()),
            other => internal(&other),
        }
    }
}

impl From<ReadingServiceError> for ApiError {
    fn from(err: ReadingServiceError) -> Self {
        match err {
            ReadingServiceError::TestNotFound => ApiError::NotFound(err.to_string()),
            other => internal(&other),
        }
    }
}

impl From<PromptServiceError> for ApiError {
    fn from(err: PromptServiceError) -> Self {
        match err {
            PromptServiceError::PromptNotFound => ApiError::NotFound(err.to_string()),
            other => internal(&other),
        }
    }
}

fn internal(err: &dyn std::error::Error) -> ApiError {
    error!(error = %err, "request failed");
    ApiError::Internal
}
