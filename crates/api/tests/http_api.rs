use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use api::{ApiState, router};
use ielts_core::model::TaskType;
use ielts_core::time::fixed_clock;
use services::{AppServices, CompletionError, CompletionService, StaticVerifier};
use storage::repository::InMemoryStorage;

struct ScriptedCompletion {
    replies: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or(CompletionError::Disabled)
    }
}

fn examiner_response(score: f64) -> String {
    format!(
        "Task Response: {score}\n\
         Coherence and Cohesion: {score}\n\
         Lexical Resource: {score}\n\
         Grammatical Range and Accuracy: {score}\n\
         Feedback: Reads well."
    )
}

async fn test_app(replies: Vec<String>) -> (Router, AppServices) {
    let mut verifier = StaticVerifier::default();
    verifier.insert("token-student", "subject-student");
    verifier.insert("token-admin", "subject-admin");

    let storage = InMemoryStorage::new().into_storage();
    let services = AppServices::new(
        &storage,
        fixed_clock(),
        Arc::new(verifier),
        Arc::new(ScriptedCompletion {
            replies: Mutex::new(replies),
        }),
    );
    (router(ApiState::new(services.clone())), services)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_returns_identity() {
    let (app, _) = test_app(Vec::new()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login/",
            None,
            Some(json!({ "id_token": "token-student", "student_id": "S001" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["uid"], "subject-student");
    assert_eq!(body["role"], "student");
    assert_eq!(body["student_id"], "S001");
}

#[tokio::test]
async fn bad_token_is_unauthorized() {
    let (app, _) = test_app(Vec::new()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login/",
            None,
            Some(json!({ "id_token": "nope" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let (app, _) = test_app(Vec::new()).await;

    let response = app
        .oneshot(json_request("POST", "/api/start-writing-session/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn writing_session_flow_over_http() {
    let (app, services) = test_app(vec![examiner_response(8.0), examiner_response(7.0)]).await;
    services
        .prompts()
        .create(TaskType::Task1, "Describe the chart.".into(), None, true)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/start-writing-session/",
            Some("token-student"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let start = response_json(response).await;
    assert_eq!(start["task1_text"], "Describe the chart.");
    assert_eq!(start["task2_text"], "No Task 2 available");
    assert!(start["task2_prompt_id"].is_null());
    let session_id = start["session_id"].as_i64().unwrap();

    for task in ["task1", "task2"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/submit-task/",
                Some("token-student"),
                Some(json!({
                    "session_id": session_id,
                    "task_type": task,
                    "question_text": "Q",
                    "submitted_text": "An essay body.",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Resubmitting a task type is rejected.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/submit-task/",
            Some("token-student"),
            Some(json!({
                "session_id": session_id,
                "task_type": "task1",
                "question_text": "Q",
                "submitted_text": "Again.",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/finish-writing-session/",
            Some("token-student"),
            Some(json!({ "session_id": session_id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Writing session completed");

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/api/essays/?session_id={session_id}"),
            Some("token-student"),
            None,
        ))
        .await
        .unwrap();
    let essays = response_json(response).await;
    assert_eq!(essays.as_array().unwrap().len(), 2);
    assert!(essays[0]["overall_band"].is_number());
}

#[tokio::test]
async fn blank_question_text_is_bad_request() {
    let (app, services) = test_app(Vec::new()).await;
    let user = services
        .accounts()
        .login("token-student", ielts_core::model::Role::Student, None)
        .await
        .unwrap();
    let start = services.writing_sessions().start(user.id).await.unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/submit-task/",
            Some("token-student"),
            Some(json!({
                "session_id": start.session.id().value(),
                "task_type": "task1",
                "question_text": "",
                "submitted_text": "An essay body.",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn finish_without_both_tasks_is_bad_request() {
    let (app, services) = test_app(Vec::new()).await;
    let user = services
        .accounts()
        .login("token-student", ielts_core::model::Role::Student, None)
        .await
        .unwrap();
    let start = services.writing_sessions().start(user.id).await.unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/finish-writing-session/",
            Some("token-student"),
            Some(json!({ "session_id": start.session.id().value() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_reading_test_is_not_found() {
    let (app, _) = test_app(Vec::new()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reading-tests/42/submit/",
            Some("token-student"),
            Some(json!({ "answers": {} })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_listing_requires_admin_role() {
    let (app, _) = test_app(Vec::new()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/admin/essays/",
            Some("token-student"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Log the admin in with the admin role first.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login/",
            None,
            Some(json!({ "id_token": "token-admin", "role": "admin" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("GET", "/api/admin/essays/", Some("token-admin"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
