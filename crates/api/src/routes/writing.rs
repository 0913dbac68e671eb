use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use ielts_core::model::{SessionId, TaskType};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::ApiState;

const NO_TASK1: &str = "No Task 1 available";
const NO_TASK2: &str = "No Task 2 available";

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/start-writing-session/", post(start_session))
        .route("/api/submit-task/", post(submit_task))
        .route("/api/finish-writing-session/", post(finish_session))
}

#[derive(Serialize)]
struct StartSessionResponse {
    session_id: i64,
    task1_prompt_id: Option<i64>,
    task2_prompt_id: Option<i64>,
    task1_text: String,
    task2_text: String,
}

async fn start_session(
    auth: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let start = state.services.writing_sessions().start(auth.id).await?;

    Ok(Json(StartSessionResponse {
        session_id: start.session.id().value(),
        task1_prompt_id: start.task1.as_ref().map(|prompt| prompt.id.value()),
        task2_prompt_id: start.task2.as_ref().map(|prompt| prompt.id.value()),
        task1_text: start
            .task1
            .map_or_else(|| NO_TASK1.to_owned(), |prompt| prompt.prompt_text),
        task2_text: start
            .task2
            .map_or_else(|| NO_TASK2.to_owned(), |prompt| prompt.prompt_text),
    }))
}

#[derive(Deserialize)]
struct SubmitTaskRequest {
    session_id: i64,
    task_type: String,
    question_text: String,
    submitted_text: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn submit_task(
    _auth: AuthUser,
    State(state): State<ApiState>,
    Json(body): Json<SubmitTaskRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let task_type = body
        .task_type
        .parse::<TaskType>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    state
        .services
        .writing_sessions()
        .submit_task(
            SessionId::new(body.session_id),
            task_type,
            body.question_text,
            body.submitted_text,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Task submitted",
    }))
}

#[derive(Deserialize)]
struct FinishSessionRequest {
    session_id: i64,
}

async fn finish_session(
    _auth: AuthUser,
    State(state): State<ApiState>,
    Json(body): Json<FinishSessionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .services
        .writing_sessions()
        .finish(SessionId::new(body.session_id))
        .await?;

    Ok(Json(MessageResponse {
        message: "Writing session completed",
    }))
}
