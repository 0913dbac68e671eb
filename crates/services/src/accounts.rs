use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use ielts_core::model::{Role, User};
use storage::repository::UserRepository;

use crate::error::AccountError;

/// A successfully verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable subject id assigned by the identity provider.
    pub subject: String,
}

/// Maps a bearer token to an identity.
///
/// Injected so the platform never depends on a concrete provider; tests use
/// [`StaticVerifier`].
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Option<VerifiedIdentity>;
}

/// Fixed token -> subject map, for tests and local development.
#[derive(Debug, Default, Clone)]
pub struct StaticVerifier {
    subjects: HashMap<String, String>,
}

impl StaticVerifier {
    #[must_use]
    pub fn new(subjects: HashMap<String, String>) -> Self {
        Self { subjects }
    }

    pub fn insert(&mut self, token: impl Into<String>, subject: impl Into<String>) {
        self.subjects.insert(token.into(), subject.into());
    }
}

#[async_trait::async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, bearer_token: &str) -> Option<VerifiedIdentity> {
        self.subjects
            .get(bearer_token)
            .map(|subject| VerifiedIdentity {
                subject: subject.clone(),
            })
    }
}

/// Login and per-request authentication.
#[derive(Clone)]
pub struct AccountService {
    verifier: Arc<dyn IdentityVerifier>,
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(verifier: Arc<dyn IdentityVerifier>, users: Arc<dyn UserRepository>) -> Self {
        Self { verifier, users }
    }

    /// Verify a login token and get-or-create the user.
    ///
    /// A student id supplied at login is backfilled onto an existing user
    /// that has none; it never overwrites one already stored.
    ///
    /// # Errors
    ///
    /// `Unverified` when the token fails verification.
    pub async fn login(
        &self,
        id_token: &str,
        role: Role,
        student_id: Option<String>,
    ) -> Result<User, AccountError> {
        let identity = self
            .verifier
            .verify(id_token)
            .await
            .ok_or(AccountError::Unverified)?;

        let mut user = self
            .users
            .get_or_create(&identity.subject, role, student_id.clone())
            .await?;

        if user.student_id.is_none() {
            if let Some(student_id) = student_id {
                self.users.set_student_id(user.id, &student_id).await?;
                user.student_id = Some(student_id);
            }
        }

        info!(subject = %user.subject, role = user.role.as_str(), "user logged in");
        Ok(user)
    }

    /// Resolve the user behind a request's bearer token.
    ///
    /// # Errors
    ///
    /// `Unverified` when the token fails verification.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<User, AccountError> {
        let identity = self
            .verifier
            .verify(bearer_token)
            .await
            .ok_or(AccountError::Unverified)?;
        Ok(self
            .users
            .get_or_create(&identity.subject, Role::Student, None)
            .await?)
    }
}
