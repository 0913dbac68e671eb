use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use ielts_core::model::{AnswerOption, QuestionId, ReadingTest, ReadingTestId};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/reading-tests/", get(list_tests))
        .route("/api/reading-tests/{id}", get(get_test))
        .route("/api/reading-tests/{id}/submit/", post(submit_test))
}

#[derive(Serialize)]
struct TestSummaryJson {
    id: i64,
    title: String,
    description: String,
}

async fn list_tests(
    _auth: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<TestSummaryJson>>, ApiError> {
    let tests = state.services.reading().list().await?;
    Ok(Json(
        tests
            .into_iter()
            .map(|summary| TestSummaryJson {
                id: summary.id.value(),
                title: summary.title,
                description: summary.description,
            })
            .collect(),
    ))
}

#[derive(Serialize)]
struct OptionJson {
    label: String,
    text: String,
}

/// A question as shown to the candidate. Answer keys never leave the server.
#[derive(Serialize)]
struct QuestionJson {
    id: i64,
    position: u32,
    question_type: &'static str,
    question_text: String,
    paragraph_ref: String,
    options: Vec<OptionJson>,
}

#[derive(Serialize)]
struct TestJson {
    id: i64,
    title: String,
    description: String,
    questions: Vec<QuestionJson>,
}

impl From<ReadingTest> for TestJson {
    fn from(test: ReadingTest) -> Self {
        Self {
            id: test.id.value(),
            title: test.title,
            description: test.description,
            questions: test
                .questions
                .into_iter()
                .map(|question| QuestionJson {
                    id: question.id.value(),
                    position: question.position,
                    question_type: question.question_type.as_str(),
                    question_text: question.question_text,
                    paragraph_ref: question.paragraph_ref,
                    options: question
                        .options
                        .into_iter()
                        .map(|AnswerOption { label, text }| OptionJson { label, text })
                        .collect(),
                })
                .collect(),
        }
    }
}

async fn get_test(
    _auth: AuthUser,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<TestJson>, ApiError> {
    let test = state.services.reading().get(ReadingTestId::new(id)).await?;
    Ok(Json(test.into()))
}

#[derive(Deserialize)]
struct SubmitTestRequest {
    answers: HashMap<String, String>,
}

#[derive(Serialize)]
struct SubmitTestResponse {
    total_questions: u32,
    correct_answers: u32,
    raw_score: u32,
    band_score: f64,
}

async fn submit_test(
    _auth: AuthUser,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<SubmitTestRequest>,
) -> Result<Json<SubmitTestResponse>, ApiError> {
    // Keys that are not question ids cannot match anything; drop them.
    let answers: HashMap<QuestionId, String> = body
        .answers
        .into_iter()
        .filter_map(|(key, answer)| {
            key.parse::<QuestionId>().ok().map(|id| (id, answer))
        })
        .collect();

    let score = state
        .services
        .reading()
        .submit(ReadingTestId::new(id), &answers)
        .await?;

    Ok(Json(SubmitTestResponse {
        total_questions: score.total,
        correct_answers: score.correct,
        raw_score: score.raw_score,
        band_score: score.band_score,
    }))
}
