use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{SessionId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session is already completed")]
    AlreadyCompleted,

    #[error("persisted session has a band score but is not completed")]
    BandWithoutCompletion,
}

/// A paired task1 + task2 writing test attempt by one user.
///
/// `band_score` is set exactly once, when the session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingSession {
    id: SessionId,
    user_id: UserId,
    started_at: DateTime<Utc>,
    completed: bool,
    band_score: Option<f64>,
}

impl WritingSession {
    /// Create a fresh session in the started state.
    #[must_use]
    pub fn new(id: SessionId, user_id: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            started_at,
            completed: false,
            band_score: None,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::BandWithoutCompletion` if a band score is
    /// stored for a session that is not marked completed.
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        started_at: DateTime<Utc>,
        completed: bool,
        band_score: Option<f64>,
    ) -> Result<Self, SessionStateError> {
        if band_score.is_some() && !completed {
            return Err(SessionStateError::BandWithoutCompletion);
        }
        Ok(Self {
            id,
            user_id,
            started_at,
            completed,
            band_score,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn band_score(&self) -> Option<f64> {
        self.band_score
    }

    /// Mark the session completed with its aggregate band.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AlreadyCompleted` if called twice.
    pub fn complete(&mut self, band_score: f64) -> Result<(), SessionStateError> {
        if self.completed {
            return Err(SessionStateError::AlreadyCompleted);
        }
        self.completed = true;
        self.band_score = Some(band_score);
        Ok(())
    }
}
