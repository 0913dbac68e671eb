use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use ielts_core::model::Role;

use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new().route("/api/login/", post(login))
}

#[derive(Deserialize)]
struct LoginRequest {
    id_token: String,
    role: Option<String>,
    student_id: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    uid: String,
    role: &'static str,
    student_id: Option<String>,
}

async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let role = match body.role.as_deref() {
        None => Role::Student,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?,
    };

    let user = state
        .services
        .accounts()
        .login(&body.id_token, role, body.student_id)
        .await?;

    // `uid` is the identity provider's subject, not the local row id.
    Ok(Json(LoginResponse {
        message: "Login successful",
        uid: user.subject,
        role: user.role.as_str(),
        student_id: user.student_id,
    }))
}
