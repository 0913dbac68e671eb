use std::collections::HashMap;
use std::sync::Arc;

use ielts_core::model::{QuestionId, ReadingTest, ReadingTestId, ReadingTestSummary};
use ielts_core::scoring::{ReadingScore, score_reading};
use storage::repository::ReadingRepository;

use crate::error::ReadingServiceError;

/// Reading-test listings and answer scoring.
#[derive(Clone)]
pub struct ReadingService {
    reading: Arc<dyn ReadingRepository>,
}

impl ReadingService {
    #[must_use]
    pub fn new(reading: Arc<dyn ReadingRepository>) -> Self {
        Self { reading }
    }

    /// All tests, id order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on repository failures.
    pub async fn list(&self) -> Result<Vec<ReadingTestSummary>, ReadingServiceError> {
        Ok(self.reading.list_tests().await?)
    }

    /// One test with its questions and options.
    ///
    /// # Errors
    ///
    /// `TestNotFound` when the id does not exist.
    pub async fn get(&self, id: ReadingTestId) -> Result<ReadingTest, ReadingServiceError> {
        self.reading
            .get_test(id)
            .await?
            .ok_or(ReadingServiceError::TestNotFound)
    }

    /// Score a submission against the test's answer keys.
    ///
    /// # Errors
    ///
    /// `TestNotFound` when the id does not exist.
    pub async fn submit(
        &self,
        id: ReadingTestId,
        answers: &HashMap<QuestionId, String>,
    ) -> Result<ReadingScore, ReadingServiceError> {
        let test = self.get(id).await?;
        Ok(score_reading(&test, answers))
    }
}
