use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ielts_core::model::{
    Assessment, Essay, EssayId, PromptId, QuestionId, ReadingQuestion, ReadingTest,
    ReadingTestId, ReadingTestSummary, Role, SessionId, TaskType, User, UserId, WritingPrompt,
    WritingSession,
};
use ielts_core::model::{AnswerOption, QuestionType};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for an essay; the id and grading fields are assigned later.
#[derive(Debug, Clone)]
pub struct NewEssay {
    pub user_id: UserId,
    pub session_id: Option<SessionId>,
    pub prompt_id: Option<PromptId>,
    pub task_type: TaskType,
    pub question_text: String,
    pub submitted_text: String,
    pub submitted_at: DateTime<Utc>,
}

/// Insert shape for a writing prompt.
#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub task_type: TaskType,
    pub prompt_text: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a reading test with its questions, used by seeding and
/// fixtures. Authoring tools are out of scope; scoring only ever reads.
#[derive(Debug, Clone)]
pub struct NewReadingTest {
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<NewReadingQuestion>,
}

#[derive(Debug, Clone)]
pub struct NewReadingQuestion {
    pub position: u32,
    pub question_type: QuestionType,
    pub question_text: String,
    pub paragraph_ref: String,
    pub options: Vec<AnswerOption>,
    pub answer_key: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch the user with this subject, creating one with the given
    /// defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get_or_create(
        &self,
        subject: &str,
        role: Role,
        student_id: Option<String>,
    ) -> Result<User, StorageError>;

    /// Fetch a user by subject id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get_by_subject(&self, subject: &str) -> Result<Option<User>, StorageError>;

    /// Backfill the student id of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn set_student_id(&self, id: UserId, student_id: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new writing session in the started state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn create(
        &self,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<WritingSession, StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get(&self, id: SessionId) -> Result<Option<WritingSession>, StorageError>;

    /// Mark a session completed and store its aggregate band.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn complete(&self, id: SessionId, band_score: f64) -> Result<(), StorageError>;
}

#[async_trait]
pub trait EssayRepository: Send + Sync {
    /// Insert a new, ungraded essay.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when an essay of the same task type
    /// already exists in the same session. The check and insert are atomic.
    async fn insert(&self, new: NewEssay) -> Result<Essay, StorageError>;

    /// Fetch an essay by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get(&self, id: EssayId) -> Result<Option<Essay>, StorageError>;

    /// All essays belonging to a session, ordered by task type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn for_session(&self, session_id: SessionId) -> Result<Vec<Essay>, StorageError>;

    /// A user's essays, newest first, optionally restricted to one session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn for_user(
        &self,
        user_id: UserId,
        session_id: Option<SessionId>,
    ) -> Result<Vec<Essay>, StorageError>;

    /// All essays with their authors, newest first, optionally filtered by
    /// the author's student id. Admin listing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn list_recent(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<(Essay, User)>, StorageError>;

    /// Persist a grading outcome for an essay.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the essay does not exist.
    async fn save_assessment(
        &self,
        id: EssayId,
        assessment: &Assessment,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Insert a prompt. When it is active, other active prompts of the same
    /// task type are deactivated in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn insert(&self, new: NewPrompt) -> Result<WritingPrompt, StorageError>;

    /// Update a prompt in place, applying the same exclusivity rule.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the prompt does not exist.
    async fn update(&self, prompt: &WritingPrompt) -> Result<(), StorageError>;

    /// Fetch a prompt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get(&self, id: PromptId) -> Result<Option<WritingPrompt>, StorageError>;

    /// All prompts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn list(&self) -> Result<Vec<WritingPrompt>, StorageError>;

    /// Currently active prompts for a task type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn active_for(&self, task_type: TaskType) -> Result<Vec<WritingPrompt>, StorageError>;

    /// Delete a prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the prompt does not exist.
    async fn delete(&self, id: PromptId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Listing of all reading tests, without questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, StorageError>;

    /// Fetch a test with its questions, options, and answer keys.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get_test(&self, id: ReadingTestId) -> Result<Option<ReadingTest>, StorageError>;

    /// Insert a complete test. Used by seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn insert_test(&self, new: NewReadingTest) -> Result<ReadingTestId, StorageError>;
}

/// Bundle of repository handles shared across services.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub essays: Arc<dyn EssayRepository>,
    pub prompts: Arc<dyn PromptRepository>,
    pub reading: Arc<dyn ReadingRepository>,
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    users: HashMap<i64, User>,
    sessions: HashMap<i64, WritingSession>,
    essays: HashMap<i64, Essay>,
    prompts: HashMap<i64, WritingPrompt>,
    tests: HashMap<i64, ReadingTest>,
    next_id: i64,
}

impl InMemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory storage for service-level tests.
///
/// All mutations of one repository call happen under a single lock, which
/// gives the same atomicity the SQLite adapter gets from transactions and
/// unique indexes.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Storage` bundle where every repository is this instance.
    #[must_use]
    pub fn into_storage(self) -> Storage {
        let shared = Arc::new(self);
        Storage {
            users: Arc::clone(&shared) as Arc<dyn UserRepository>,
            sessions: Arc::clone(&shared) as Arc<dyn SessionRepository>,
            essays: Arc::clone(&shared) as Arc<dyn EssayRepository>,
            prompts: Arc::clone(&shared) as Arc<dyn PromptRepository>,
            reading: shared as Arc<dyn ReadingRepository>,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn get_or_create(
        &self,
        subject: &str,
        role: Role,
        student_id: Option<String>,
    ) -> Result<User, StorageError> {
        let mut state = self.lock()?;
        if let Some(user) = state.users.values().find(|u| u.subject == subject) {
            return Ok(user.clone());
        }
        let id = state.next_id();
        let user = User {
            id: UserId::new(id),
            subject: subject.to_owned(),
            role,
            student_id,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_by_subject(&self, subject: &str) -> Result<Option<User>, StorageError> {
        let state = self.lock()?;
        Ok(state.users.values().find(|u| u.subject == subject).cloned())
    }

    async fn set_student_id(&self, id: UserId, student_id: &str) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let user = state.users.get_mut(&id.value()).ok_or(StorageError::NotFound)?;
        user.student_id = Some(student_id.to_owned());
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStorage {
    async fn create(
        &self,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<WritingSession, StorageError> {
        let mut state = self.lock()?;
        let id = state.next_id();
        let session = WritingSession::new(SessionId::new(id), user_id, started_at);
        state.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: SessionId) -> Result<Option<WritingSession>, StorageError> {
        let state = self.lock()?;
        Ok(state.sessions.get(&id.value()).cloned())
    }

    async fn complete(&self, id: SessionId, band_score: f64) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&id.value())
            .ok_or(StorageError::NotFound)?;
        session
            .complete(band_score)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EssayRepository for InMemoryStorage {
    async fn insert(&self, new: NewEssay) -> Result<Essay, StorageError> {
        let mut state = self.lock()?;
        if let Some(session_id) = new.session_id {
            let duplicate = state.essays.values().any(|e| {
                e.session_id() == Some(session_id) && e.task_type() == new.task_type
            });
            if duplicate {
                return Err(StorageError::Conflict);
            }
        }
        let id = state.next_id();
        let essay = Essay::new(
            EssayId::new(id),
            new.user_id,
            new.session_id,
            new.prompt_id,
            new.task_type,
            new.question_text,
            new.submitted_text,
            new.submitted_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.essays.insert(id, essay.clone());
        Ok(essay)
    }

    async fn get(&self, id: EssayId) -> Result<Option<Essay>, StorageError> {
        let state = self.lock()?;
        Ok(state.essays.get(&id.value()).cloned())
    }

    async fn for_session(&self, session_id: SessionId) -> Result<Vec<Essay>, StorageError> {
        let state = self.lock()?;
        let mut essays: Vec<Essay> = state
            .essays
            .values()
            .filter(|e| e.session_id() == Some(session_id))
            .cloned()
            .collect();
        essays.sort_by_key(|e| (e.task_type().as_str(), e.id()));
        Ok(essays)
    }

    async fn for_user(
        &self,
        user_id: UserId,
        session_id: Option<SessionId>,
    ) -> Result<Vec<Essay>, StorageError> {
        let state = self.lock()?;
        let mut essays: Vec<Essay> = state
            .essays
            .values()
            .filter(|e| e.user_id() == user_id)
            .filter(|e| session_id.is_none() || e.session_id() == session_id)
            .cloned()
            .collect();
        essays.sort_by_key(|e| std::cmp::Reverse((e.submitted_at(), e.id())));
        Ok(essays)
    }

    async fn list_recent(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<(Essay, User)>, StorageError> {
        let state = self.lock()?;
        let mut rows: Vec<(Essay, User)> = state
            .essays
            .values()
            .filter_map(|e| {
                let user = state.users.get(&e.user_id().value())?;
                Some((e.clone(), user.clone()))
            })
            .filter(|(_, user)| match student_id {
                Some(filter) => user.student_id.as_deref() == Some(filter),
                None => true,
            })
            .collect();
        rows.sort_by_key(|(e, _)| std::cmp::Reverse((e.submitted_at(), e.id())));
        Ok(rows)
    }

    async fn save_assessment(
        &self,
        id: EssayId,
        assessment: &Assessment,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let essay = state
            .essays
            .get_mut(&id.value())
            .ok_or(StorageError::NotFound)?;
        essay.apply_assessment(assessment.clone());
        Ok(())
    }
}

#[async_trait]
impl PromptRepository for InMemoryStorage {
    async fn insert(&self, new: NewPrompt) -> Result<WritingPrompt, StorageError> {
        let mut state = self.lock()?;
        let id = state.next_id();
        if new.is_active {
            deactivate_siblings(&mut state, new.task_type, PromptId::new(id));
        }
        let prompt = WritingPrompt {
            id: PromptId::new(id),
            task_type: new.task_type,
            prompt_text: new.prompt_text,
            image: new.image,
            is_active: new.is_active,
            created_at: new.created_at,
        };
        state.prompts.insert(id, prompt.clone());
        Ok(prompt)
    }

    async fn update(&self, prompt: &WritingPrompt) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.prompts.contains_key(&prompt.id.value()) {
            return Err(StorageError::NotFound);
        }
        if prompt.is_active {
            deactivate_siblings(&mut state, prompt.task_type, prompt.id);
        }
        state.prompts.insert(prompt.id.value(), prompt.clone());
        Ok(())
    }

    async fn get(&self, id: PromptId) -> Result<Option<WritingPrompt>, StorageError> {
        let state = self.lock()?;
        Ok(state.prompts.get(&id.value()).cloned())
    }

    async fn list(&self) -> Result<Vec<WritingPrompt>, StorageError> {
        let state = self.lock()?;
        let mut prompts: Vec<WritingPrompt> = state.prompts.values().cloned().collect();
        prompts.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
        Ok(prompts)
    }

    async fn active_for(&self, task_type: TaskType) -> Result<Vec<WritingPrompt>, StorageError> {
        let state = self.lock()?;
        let mut prompts: Vec<WritingPrompt> = state
            .prompts
            .values()
            .filter(|p| p.task_type == task_type && p.is_active)
            .cloned()
            .collect();
        prompts.sort_by_key(|p| p.id);
        Ok(prompts)
    }

    async fn delete(&self, id: PromptId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .prompts
            .remove(&id.value())
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

fn deactivate_siblings(state: &mut InMemoryState, task_type: TaskType, keep: PromptId) {
    for prompt in state.prompts.values_mut() {
        if prompt.task_type == task_type && prompt.id != keep {
            prompt.is_active = false;
        }
    }
}

#[async_trait]
impl ReadingRepository for InMemoryStorage {
    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, StorageError> {
        let state = self.lock()?;
        let mut tests: Vec<ReadingTestSummary> = state
            .tests
            .values()
            .map(|t| ReadingTestSummary {
                id: t.id,
                title: t.title.clone(),
                description: t.description.clone(),
            })
            .collect();
        tests.sort_by_key(|t| t.id);
        Ok(tests)
    }

    async fn get_test(&self, id: ReadingTestId) -> Result<Option<ReadingTest>, StorageError> {
        let state = self.lock()?;
        Ok(state.tests.get(&id.value()).cloned())
    }

    async fn insert_test(&self, new: NewReadingTest) -> Result<ReadingTestId, StorageError> {
        let mut state = self.lock()?;
        let test_id = state.next_id();
        let questions = new
            .questions
            .into_iter()
            .map(|q| {
                let question_id = state.next_id();
                ReadingQuestion {
                    id: QuestionId::new(question_id),
                    position: q.position,
                    question_type: q.question_type,
                    question_text: q.question_text,
                    paragraph_ref: q.paragraph_ref,
                    options: q.options,
                    answer_key: q.answer_key,
                }
            })
            .collect();
        let test = ReadingTest {
            id: ReadingTestId::new(test_id),
            title: new.title,
            description: new.description,
            created_at: new.created_at,
            questions,
        };
        state.tests.insert(test_id, test);
        Ok(ReadingTestId::new(test_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ielts_core::time::fixed_now;

    fn new_essay(user: i64, session: Option<i64>, task_type: TaskType) -> NewEssay {
        NewEssay {
            user_id: UserId::new(user),
            session_id: session.map(SessionId::new),
            prompt_id: None,
            task_type,
            question_text: "Q".into(),
            submitted_text: "body".into(),
            submitted_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn duplicate_task_type_conflicts() {
        let storage = InMemoryStorage::new();
        let session = SessionRepository::create(&storage, UserId::new(1), fixed_now())
            .await
            .unwrap();

        EssayRepository::insert(
            &storage,
            new_essay(1, Some(session.id().value()), TaskType::Task1),
        )
        .await
        .unwrap();

        let err = EssayRepository::insert(
            &storage,
            new_essay(1, Some(session.id().value()), TaskType::Task1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn activating_prompt_deactivates_same_type_only() {
        let storage = InMemoryStorage::new();
        let first = PromptRepository::insert(
            &storage,
            NewPrompt {
                task_type: TaskType::Task1,
                prompt_text: "A".into(),
                image: None,
                is_active: true,
                created_at: fixed_now(),
            },
        )
        .await
        .unwrap();
        let other_type = PromptRepository::insert(
            &storage,
            NewPrompt {
                task_type: TaskType::Task2,
                prompt_text: "T2".into(),
                image: None,
                is_active: true,
                created_at: fixed_now(),
            },
        )
        .await
        .unwrap();
        let second = PromptRepository::insert(
            &storage,
            NewPrompt {
                task_type: TaskType::Task1,
                prompt_text: "B".into(),
                image: None,
                is_active: true,
                created_at: fixed_now(),
            },
        )
        .await
        .unwrap();

        let first = PromptRepository::get(&storage, first.id).await.unwrap().unwrap();
        assert!(!first.is_active);
        let second = PromptRepository::get(&storage, second.id).await.unwrap().unwrap();
        assert!(second.is_active);
        let other_type = PromptRepository::get(&storage, other_type.id)
            .await
            .unwrap()
            .unwrap();
        assert!(other_type.is_active);
    }
}
