use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ielts_core::model::{PromptId, TaskType, WritingPrompt};

use crate::error::ApiError;
use crate::extract::{AdminUser, AuthUser};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/prompts/", get(list_prompts).post(create_prompt))
        .route("/api/prompts/active/", get(active_prompt))
        .route("/api/prompts/{id}", put(update_prompt).delete(delete_prompt))
}

#[derive(Serialize)]
struct PromptJson {
    id: i64,
    task_type: &'static str,
    prompt_text: String,
    image: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<WritingPrompt> for PromptJson {
    fn from(prompt: WritingPrompt) -> Self {
        Self {
            id: prompt.id.value(),
            task_type: prompt.task_type.as_str(),
            prompt_text: prompt.prompt_text,
            image: prompt.image,
            is_active: prompt.is_active,
            created_at: prompt.created_at,
        }
    }
}

async fn list_prompts(
    _admin: AdminUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<PromptJson>>, ApiError> {
    let prompts = state.services.prompts().list().await?;
    Ok(Json(prompts.into_iter().map(PromptJson::from).collect()))
}

#[derive(Deserialize)]
struct CreatePromptRequest {
    task_type: String,
    prompt_text: String,
    image: Option<String>,
    #[serde(default)]
    is_active: bool,
}

async fn create_prompt(
    _admin: AdminUser,
    State(state): State<ApiState>,
    Json(body): Json<CreatePromptRequest>,
) -> Result<Json<PromptJson>, ApiError> {
    let task_type = body
        .task_type
        .parse::<TaskType>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let prompt = state
        .services
        .prompts()
        .create(task_type, body.prompt_text, body.image, body.is_active)
        .await?;
    Ok(Json(prompt.into()))
}

#[derive(Deserialize)]
struct UpdatePromptRequest {
    task_type: Option<String>,
    prompt_text: Option<String>,
    image: Option<String>,
    is_active: Option<bool>,
}

async fn update_prompt(
    _admin: AdminUser,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePromptRequest>,
) -> Result<Json<PromptJson>, ApiError> {
    let service = state.services.prompts();
    let mut prompt = service.get(PromptId::new(id)).await?;

    if let Some(raw) = body.task_type {
        prompt.task_type = raw
            .parse::<TaskType>()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    }
    if let Some(prompt_text) = body.prompt_text {
        prompt.prompt_text = prompt_text;
    }
    if let Some(image) = body.image {
        prompt.image = Some(image);
    }
    if let Some(is_active) = body.is_active {
        prompt.is_active = is_active;
    }

    service.update(&prompt).await?;
    Ok(Json(prompt.into()))
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn delete_prompt(
    _admin: AdminUser,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.services.prompts().delete(PromptId::new(id)).await?;
    Ok(Json(MessageResponse {
        message: "Prompt deleted",
    }))
}

#[derive(Deserialize)]
struct ActivePromptQuery {
    task_type: String,
}

async fn active_prompt(
    _auth: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<ActivePromptQuery>,
) -> Result<Json<PromptJson>, ApiError> {
    let task_type = query
        .task_type
        .parse::<TaskType>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let prompt = state
        .services
        .prompts()
        .active_for(task_type)
        .await?
        .ok_or_else(|| ApiError::NotFound("no active prompt".into()))?;
    Ok(Json(prompt.into()))
}
