use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ielts_core::model::{Essay, EssayId, SessionId, TaskType, User};

use crate::error::ApiError;
use crate::extract::{AdminUser, AuthUser};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/essay/", post(submit_essay))
        .route("/api/essays/", get(list_essays))
        .route("/api/essays/{id}", get(get_essay))
        .route("/api/admin/essays/", get(admin_list_essays))
}

#[derive(Serialize)]
struct EssayJson {
    id: i64,
    user_id: i64,
    session_id: Option<i64>,
    prompt_id: Option<i64>,
    task_type: &'static str,
    question_text: String,
    submitted_text: String,
    submitted_at: DateTime<Utc>,
    task_response: Option<f64>,
    coherence_cohesion: Option<f64>,
    lexical_resource: Option<f64>,
    grammar: Option<f64>,
    overall_band: Option<f64>,
    feedback: Option<String>,
}

impl From<Essay> for EssayJson {
    fn from(essay: Essay) -> Self {
        let scores = essay.assessment().map(|assessment| *assessment.scores());
        Self {
            id: essay.id().value(),
            user_id: essay.user_id().value(),
            session_id: essay.session_id().map(|id| id.value()),
            prompt_id: essay.prompt_id().map(|id| id.value()),
            task_type: essay.task_type().as_str(),
            overall_band: essay.overall_band(),
            feedback: essay
                .assessment()
                .map(|assessment| assessment.feedback().to_owned()),
            task_response: scores.map(|scores| scores.task_response),
            coherence_cohesion: scores.map(|scores| scores.coherence_cohesion),
            lexical_resource: scores.map(|scores| scores.lexical_resource),
            grammar: scores.map(|scores| scores.grammar),
            question_text: essay.question_text().to_owned(),
            submitted_text: essay.submitted_text().to_owned(),
            submitted_at: essay.submitted_at(),
        }
    }
}

#[derive(Deserialize)]
struct SubmitEssayRequest {
    task_type: String,
    submitted_text: String,
    #[serde(default)]
    question_text: String,
}

async fn submit_essay(
    auth: AuthUser,
    State(state): State<ApiState>,
    Json(body): Json<SubmitEssayRequest>,
) -> Result<Json<EssayJson>, ApiError> {
    let task_type = body
        .task_type
        .parse::<TaskType>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let essay = state
        .services
        .essays()
        .submit(auth.id, task_type, body.question_text, body.submitted_text)
        .await?;
    Ok(Json(essay.into()))
}

#[derive(Deserialize)]
struct ListEssaysQuery {
    session_id: Option<i64>,
}

async fn list_essays(
    auth: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<ListEssaysQuery>,
) -> Result<Json<Vec<EssayJson>>, ApiError> {
    let essays = state
        .services
        .essays()
        .list_for_user(auth.id, query.session_id.map(SessionId::new))
        .await?;
    Ok(Json(essays.into_iter().map(EssayJson::from).collect()))
}

async fn get_essay(
    auth: AuthUser,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<EssayJson>, ApiError> {
    let essay = state.services.essays().get(EssayId::new(id)).await?;
    if essay.user_id() != auth.id && !auth.is_admin() {
        return Err(ApiError::NotFound("essay not found".into()));
    }
    Ok(Json(essay.into()))
}

#[derive(Serialize)]
struct AdminEssayJson {
    #[serde(flatten)]
    essay: EssayJson,
    student_id: Option<String>,
    subject: String,
}

#[derive(Deserialize)]
struct AdminEssaysQuery {
    student_id: Option<String>,
}

async fn admin_list_essays(
    _admin: AdminUser,
    State(state): State<ApiState>,
    Query(query): Query<AdminEssaysQuery>,
) -> Result<Json<Vec<AdminEssayJson>>, ApiError> {
    let essays = state
        .services
        .essays()
        .list_recent(query.student_id.as_deref())
        .await?;

    Ok(Json(
        essays
            .into_iter()
            .map(|(essay, author): (Essay, User)| AdminEssayJson {
                essay: essay.into(),
                student_id: author.student_id,
                subject: author.subject,
            })
            .collect(),
    ))
}
