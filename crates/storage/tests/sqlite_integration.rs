use ielts_core::model::{
    AnswerOption, Assessment, QuestionType, Role, RubricScores, TaskType,
};
use ielts_core::time::fixed_now;
use storage::repository::{
    EssayRepository, NewEssay, NewPrompt, NewReadingQuestion, NewReadingTest, PromptRepository,
    ReadingRepository, SessionRepository, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn new_essay(
    user_id: ielts_core::model::UserId,
    session_id: Option<ielts_core::model::SessionId>,
    task_type: TaskType,
) -> NewEssay {
    NewEssay {
        user_id,
        session_id,
        prompt_id: None,
        task_type,
        question_text: "Describe the chart.".into(),
        submitted_text: "The chart shows...".into(),
        submitted_at: fixed_now(),
    }
}

#[tokio::test]
async fn essay_roundtrip_persists_assessment() {
    let repo = connect("memdb_essay_roundtrip").await;
    let user = repo
        .get_or_create("subject-1", Role::Student, Some("S001".into()))
        .await
        .unwrap();
    let session = SessionRepository::create(&repo, user.id, fixed_now())
        .await
        .unwrap();

    let essay = EssayRepository::insert(
        &repo,
        new_essay(user.id, Some(session.id()), TaskType::Task1),
    )
    .await
    .unwrap();
    assert!(!essay.is_graded());

    let assessment = Assessment::new(
        RubricScores {
            task_response: 7.0,
            coherence_cohesion: 8.0,
            lexical_resource: 7.5,
            grammar: 7.0,
        },
        "Well structured.".into(),
    );
    repo.save_assessment(essay.id(), &assessment).await.unwrap();

    let fetched = EssayRepository::get(&repo, essay.id())
        .await
        .unwrap()
        .expect("essay exists");
    assert!(fetched.is_graded());
    // mean 7.375 -> 7.5
    assert_eq!(fetched.overall_band(), Some(7.5));
    assert_eq!(
        fetched.assessment().map(|a| a.feedback().to_owned()),
        Some("Well structured.".to_owned())
    );
}

#[tokio::test]
async fn duplicate_task_type_in_session_conflicts() {
    let repo = connect("memdb_duplicate_task").await;
    let user = repo
        .get_or_create("subject-2", Role::Student, None)
        .await
        .unwrap();
    let session = SessionRepository::create(&repo, user.id, fixed_now())
        .await
        .unwrap();

    EssayRepository::insert(
        &repo,
        new_essay(user.id, Some(session.id()), TaskType::Task2),
    )
    .await
    .unwrap();

    let err = EssayRepository::insert(
        &repo,
        new_essay(user.id, Some(session.id()), TaskType::Task2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // Standalone essays carry no session and are not constrained.
    EssayRepository::insert(&repo, new_essay(user.id, None, TaskType::Task2))
        .await
        .unwrap();
    EssayRepository::insert(&repo, new_essay(user.id, None, TaskType::Task2))
        .await
        .unwrap();
}

#[tokio::test]
async fn session_complete_sets_band_once() {
    let repo = connect("memdb_session_complete").await;
    let user = repo
        .get_or_create("subject-3", Role::Student, None)
        .await
        .unwrap();
    let session = SessionRepository::create(&repo, user.id, fixed_now())
        .await
        .unwrap();

    SessionRepository::complete(&repo, session.id(), 7.5)
        .await
        .unwrap();

    let fetched = SessionRepository::get(&repo, session.id())
        .await
        .unwrap()
        .expect("session exists");
    assert!(fetched.is_completed());
    assert_eq!(fetched.band_score(), Some(7.5));
}

#[tokio::test]
async fn activating_prompt_deactivates_siblings_atomically() {
    let repo = connect("memdb_prompt_exclusive").await;

    let first = PromptRepository::insert(
        &repo,
        NewPrompt {
            task_type: TaskType::Task1,
            prompt_text: "Prompt A".into(),
            image: None,
            is_active: true,
            created_at: fixed_now(),
        },
    )
    .await
    .unwrap();
    let unrelated = PromptRepository::insert(
        &repo,
        NewPrompt {
            task_type: TaskType::Task2,
            prompt_text: "Task 2 prompt".into(),
            image: None,
            is_active: true,
            created_at: fixed_now(),
        },
    )
    .await
    .unwrap();
    let second = PromptRepository::insert(
        &repo,
        NewPrompt {
            task_type: TaskType::Task1,
            prompt_text: "Prompt B".into(),
            image: None,
            is_active: true,
            created_at: fixed_now(),
        },
    )
    .await
    .unwrap();

    let first = PromptRepository::get(&repo, first.id).await.unwrap().unwrap();
    assert!(!first.is_active);
    let second = PromptRepository::get(&repo, second.id).await.unwrap().unwrap();
    assert!(second.is_active);
    let unrelated = PromptRepository::get(&repo, unrelated.id)
        .await
        .unwrap()
        .unwrap();
    assert!(unrelated.is_active);

    let active = PromptRepository::active_for(&repo, TaskType::Task1)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
}

#[tokio::test]
async fn reading_test_roundtrip_with_options_and_keys() {
    let repo = connect("memdb_reading_roundtrip").await;

    let test_id = repo
        .insert_test(NewReadingTest {
            title: "Academic Reading 1".into(),
            description: "Passage about glaciers".into(),
            created_at: fixed_now(),
            questions: vec![
                NewReadingQuestion {
                    position: 1,
                    question_type: QuestionType::MultipleChoice,
                    question_text: "What melts first?".into(),
                    paragraph_ref: "A".into(),
                    options: vec![
                        AnswerOption {
                            label: "A".into(),
                            text: "Surface ice".into(),
                        },
                        AnswerOption {
                            label: "B".into(),
                            text: "Base ice".into(),
                        },
                    ],
                    answer_key: Some("A".into()),
                },
                NewReadingQuestion {
                    position: 2,
                    question_type: QuestionType::TrueFalseNotGiven,
                    question_text: "Glaciers grow in summer.".into(),
                    paragraph_ref: String::new(),
                    options: Vec::new(),
                    answer_key: None,
                },
            ],
        })
        .await
        .unwrap();

    let summaries = repo.list_tests().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "Academic Reading 1");

    let test = repo.get_test(test_id).await.unwrap().expect("test exists");
    assert_eq!(test.questions.len(), 2);
    assert_eq!(test.questions[0].options.len(), 2);
    assert_eq!(test.questions[0].answer_key.as_deref(), Some("A"));
    assert_eq!(test.questions[1].answer_key, None);
    assert!(test.questions[1].options.is_empty());
}

#[tokio::test]
async fn get_or_create_is_idempotent_and_backfills_student_id() {
    let repo = connect("memdb_users").await;

    let created = repo
        .get_or_create("subject-9", Role::Student, None)
        .await
        .unwrap();
    let again = repo
        .get_or_create("subject-9", Role::Admin, Some("ignored".into()))
        .await
        .unwrap();
    assert_eq!(created.id, again.id);
    assert_eq!(again.role, Role::Student);
    assert_eq!(again.student_id, None);

    repo.set_student_id(created.id, "S123").await.unwrap();
    let fetched = repo.get_by_subject("subject-9").await.unwrap().unwrap();
    assert_eq!(fetched.student_id.as_deref(), Some("S123"));
}
