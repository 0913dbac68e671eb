use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::accounts::{AccountService, IdentityVerifier};
use crate::completion::CompletionService;
use crate::error::AppServicesError;
use crate::essays::EssayService;
use crate::grader::EssayGrader;
use crate::prompts::PromptService;
use crate::reading::ReadingService;
use crate::sessions::WritingSessionService;

/// Assembles the platform's services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    accounts: Arc<AccountService>,
    essays: Arc<EssayService>,
    writing_sessions: Arc<WritingSessionService>,
    reading: Arc<ReadingService>,
    prompts: Arc<PromptService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        verifier: Arc<dyn IdentityVerifier>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, verifier, completion))
    }

    /// Build services over an already-initialized storage bundle.
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        verifier: Arc<dyn IdentityVerifier>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        let grader = EssayGrader::new(completion);

        let accounts = Arc::new(AccountService::new(verifier, Arc::clone(&storage.users)));
        let essays = Arc::new(EssayService::new(
            clock,
            grader.clone(),
            Arc::clone(&storage.essays),
        ));
        let writing_sessions = Arc::new(WritingSessionService::new(
            clock,
            grader,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.essays),
            Arc::clone(&storage.prompts),
        ));
        let reading = Arc::new(ReadingService::new(Arc::clone(&storage.reading)));
        let prompts = Arc::new(PromptService::new(clock, Arc::clone(&storage.prompts)));

        Self {
            accounts,
            essays,
            writing_sessions,
            reading,
            prompts,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn essays(&self) -> Arc<EssayService> {
        Arc::clone(&self.essays)
    }

    #[must_use]
    pub fn writing_sessions(&self) -> Arc<WritingSessionService> {
        Arc::clone(&self.writing_sessions)
    }

    #[must_use]
    pub fn reading(&self) -> Arc<ReadingService> {
        Arc::clone(&self.reading)
    }

    #[must_use]
    pub fn prompts(&self) -> Arc<PromptService> {
        Arc::clone(&self.prompts)
    }
}
