use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ielts_core::model::{EssayError, Role, TaskType};
use ielts_core::time::fixed_clock;
use services::{
    AccountError, AppServices, CompletionError, CompletionService, SessionServiceError,
    StaticVerifier,
};
use storage::repository::InMemoryStorage;

enum Script {
    Reply(String),
    Fail,
}

/// Plays back a fixed sequence of examiner responses.
struct ScriptedCompletion {
    script: Mutex<VecDeque<Script>>,
}

impl ScriptedCompletion {
    fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
        })
    }

    fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CompletionError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Fail) => Err(CompletionError::EmptyResponse),
            None => panic!("completion called more times than scripted"),
        }
    }
}

fn examiner_response(task: f64, coherence: f64, lexical: f64, grammar: f64) -> String {
    format!(
        "Task Response: {task}\n\
         Coherence and Cohesion: {coherence}\n\
         Lexical Resource: {lexical}\n\
         Grammatical Range and Accuracy: {grammar}\n\
         Feedback: Solid work overall."
    )
}

fn verifier() -> Arc<StaticVerifier> {
    let mut verifier = StaticVerifier::default();
    verifier.insert("token-alice", "subject-alice");
    Arc::new(verifier)
}

fn app(completion: Arc<dyn CompletionService>) -> AppServices {
    let storage = InMemoryStorage::new().into_storage();
    AppServices::new(&storage, fixed_clock(), verifier(), completion)
}

async fn seed_prompts(app: &AppServices) {
    app.prompts()
        .create(TaskType::Task1, "Describe the chart.".into(), None, true)
        .await
        .unwrap();
    app.prompts()
        .create(TaskType::Task2, "Discuss both views.".into(), None, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn full_session_flow_grades_both_tasks() {
    let completion = ScriptedCompletion::new(vec![
        Script::Reply(examiner_response(7.0, 7.0, 7.0, 7.0)),
        Script::Reply(examiner_response(8.0, 8.0, 8.0, 8.0)),
    ]);
    let app = app(completion.clone());
    seed_prompts(&app).await;
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();

    let start = app.writing_sessions().start(user.id).await.unwrap();
    assert!(start.task1.is_some());
    assert!(start.task2.is_some());
    let session_id = start.session.id();

    app.writing_sessions()
        .submit_task(
            session_id,
            TaskType::Task1,
            "Describe the chart.".into(),
            "The chart shows...".into(),
        )
        .await
        .unwrap();
    app.writing_sessions()
        .submit_task(
            session_id,
            TaskType::Task2,
            "Discuss both views.".into(),
            "Some people argue...".into(),
        )
        .await
        .unwrap();

    let session = app.writing_sessions().finish(session_id).await.unwrap();
    assert!(session.is_completed());
    // (7.0 + 8.0) / 2 = 7.5
    assert_eq!(session.band_score(), Some(7.5));
    assert_eq!(completion.remaining(), 0);

    let essays = app
        .essays()
        .list_for_user(user.id, Some(session_id))
        .await
        .unwrap();
    assert_eq!(essays.len(), 2);
    assert!(essays.iter().all(ielts_core::model::Essay::is_graded));
}

#[tokio::test]
async fn duplicate_task_submission_rejected() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();
    let session_id = start.session.id();

    app.writing_sessions()
        .submit_task(session_id, TaskType::Task1, "Q".into(), "First attempt.".into())
        .await
        .unwrap();
    let err = app
        .writing_sessions()
        .submit_task(session_id, TaskType::Task1, "Q".into(), "Second attempt.".into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionServiceError::DuplicateSubmission(TaskType::Task1)
    ));
}

#[tokio::test]
async fn finish_requires_both_tasks() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();
    let session_id = start.session.id();

    app.writing_sessions()
        .submit_task(session_id, TaskType::Task1, "Q".into(), "Only one task.".into())
        .await
        .unwrap();

    let err = app.writing_sessions().finish(session_id).await.unwrap_err();
    assert!(matches!(err, SessionServiceError::IncompleteSession));
}

#[tokio::test]
async fn grading_failure_keeps_progress_and_retry_completes() {
    let completion = ScriptedCompletion::new(vec![
        Script::Reply(examiner_response(6.0, 6.0, 6.0, 6.0)),
        Script::Fail,
        // Retry grades only the remaining essay.
        Script::Reply(examiner_response(7.0, 7.0, 7.0, 7.0)),
    ]);
    let app = app(completion.clone());
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();
    let session_id = start.session.id();

    app.writing_sessions()
        .submit_task(session_id, TaskType::Task1, "Q1".into(), "First essay.".into())
        .await
        .unwrap();
    app.writing_sessions()
        .submit_task(session_id, TaskType::Task2, "Q2".into(), "Second essay.".into())
        .await
        .unwrap();

    let err = app.writing_sessions().finish(session_id).await.unwrap_err();
    assert!(matches!(err, SessionServiceError::Grading(_)));

    // The first assessment survived the failed attempt.
    let essays = app
        .essays()
        .list_for_user(user.id, Some(session_id))
        .await
        .unwrap();
    assert_eq!(essays.iter().filter(|essay| essay.is_graded()).count(), 1);

    let session = app.writing_sessions().finish(session_id).await.unwrap();
    assert!(session.is_completed());
    // (6.0 + 7.0) / 2 = 6.5
    assert_eq!(session.band_score(), Some(6.5));
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn finishing_completed_session_is_noop() {
    let completion = ScriptedCompletion::new(vec![
        Script::Reply(examiner_response(7.0, 7.0, 7.0, 7.0)),
        Script::Reply(examiner_response(7.0, 7.0, 7.0, 7.0)),
    ]);
    let app = app(completion.clone());
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();
    let session_id = start.session.id();

    app.writing_sessions()
        .submit_task(session_id, TaskType::Task1, "Q1".into(), "First essay.".into())
        .await
        .unwrap();
    app.writing_sessions()
        .submit_task(session_id, TaskType::Task2, "Q2".into(), "Second essay.".into())
        .await
        .unwrap();

    let first = app.writing_sessions().finish(session_id).await.unwrap();
    let second = app.writing_sessions().finish(session_id).await.unwrap();
    assert_eq!(first.band_score(), second.band_score());
    // No regrading on the second call.
    assert_eq!(completion.remaining(), 0);
}

#[tokio::test]
async fn blank_submission_rejected() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();

    let err = app
        .writing_sessions()
        .submit_task(start.session.id(), TaskType::Task1, "Q".into(), "   ".into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionServiceError::Essay(EssayError::EmptySubmission)
    ));
}

#[tokio::test]
async fn blank_question_rejected() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    let start = app.writing_sessions().start(user.id).await.unwrap();

    let err = app
        .writing_sessions()
        .submit_task(
            start.session.id(),
            TaskType::Task1,
            String::new(),
            "An essay body.".into(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionServiceError::Essay(EssayError::EmptyQuestion)
    ));

    // Nothing was recorded for the session.
    let essays = app
        .essays()
        .list_for_user(user.id, Some(start.session.id()))
        .await
        .unwrap();
    assert!(essays.is_empty());
}

#[tokio::test]
async fn start_without_active_prompts_yields_none() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();

    let start = app.writing_sessions().start(user.id).await.unwrap();
    assert!(start.task1.is_none());
    assert!(start.task2.is_none());
}

#[tokio::test]
async fn standalone_essay_graded_immediately() {
    let completion = ScriptedCompletion::new(vec![Script::Reply(examiner_response(
        7.0, 6.5, 7.0, 6.0,
    ))]);
    let app = app(completion);
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();

    let essay = app
        .essays()
        .submit(
            user.id,
            TaskType::Task2,
            "Discuss both views.".into(),
            "Some people argue...".into(),
        )
        .await
        .unwrap();
    assert!(essay.is_graded());
    // mean 6.625 -> 6.5
    assert_eq!(essay.overall_band(), Some(6.5));
}

#[tokio::test]
async fn unparsed_rubrics_score_zero() {
    let completion = ScriptedCompletion::new(vec![Script::Reply(
        "The essay was acceptable but I will not give numbers.".into(),
    )]);
    let app = app(completion);
    let user = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();

    let essay = app
        .essays()
        .submit(user.id, TaskType::Task1, "Q".into(), "Body text.".into())
        .await
        .unwrap();
    assert_eq!(essay.overall_band(), Some(0.0));
}

#[tokio::test]
async fn login_backfills_student_id_once() {
    let app = app(ScriptedCompletion::new(Vec::new()));

    let first = app
        .accounts()
        .login("token-alice", Role::Student, None)
        .await
        .unwrap();
    assert_eq!(first.student_id, None);

    let second = app
        .accounts()
        .login("token-alice", Role::Student, Some("S042".into()))
        .await
        .unwrap();
    assert_eq!(second.student_id.as_deref(), Some("S042"));

    let third = app
        .accounts()
        .login("token-alice", Role::Student, Some("S999".into()))
        .await
        .unwrap();
    assert_eq!(third.student_id.as_deref(), Some("S042"));
}

#[tokio::test]
async fn unknown_token_is_unverified() {
    let app = app(ScriptedCompletion::new(Vec::new()));
    let err = app
        .accounts()
        .login("token-nobody", Role::Student, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Unverified));
}

#[tokio::test]
async fn activating_prompt_swaps_the_active_one() {
    let app = app(ScriptedCompletion::new(Vec::new()));

    let first = app
        .prompts()
        .create(TaskType::Task1, "Prompt A".into(), None, true)
        .await
        .unwrap();
    let second = app
        .prompts()
        .create(TaskType::Task1, "Prompt B".into(), None, true)
        .await
        .unwrap();

    let active = app
        .prompts()
        .active_for(TaskType::Task1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, second.id);

    let first = app.prompts().get(first.id).await.unwrap();
    assert!(!first.is_active);
}
