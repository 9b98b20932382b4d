//! Refresh-token session: the single stored pointer per identity.
//!
//! A presented (signature-valid) refresh token is classified against the
//! stored pointer:
//!
//! ```text
//! stored == presented  -> Active       -> rotate (conditional write)
//! stored != presented  -> Compromised  -> revoke -> Revoked
//! stored is empty      -> Revoked
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::AuthError;
use crate::account::{IdentityStore, StoreError, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Presented token is the current one
    Active,
    /// Presented token was already superseded: possible theft
    Compromised,
    /// No session on record (logged out, or revoked after reuse)
    Revoked,
}

impl SessionState {
    pub fn classify(stored: Option<&str>, presented: &str) -> Self {
        match stored {
            None => SessionState::Revoked,
            Some(current) if current.as_bytes() == presented.as_bytes() => SessionState::Active,
            Some(_) => SessionState::Compromised,
        }
    }

    /// State after the revocation that answers a reuse.
    pub fn on_revoke(self) -> Self {
        SessionState::Revoked
    }
}

/// Session pointer operations over the identity store, each bounded by a timeout.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn IdentityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn identities(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Run a store call under the timeout. Elapsed timeout is a transient failure.
    pub async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(AuthError::from),
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Identity store call timed out");
                Err(AuthError::TransientStore(format!("{} timed out", op)))
            }
        }
    }

    pub async fn get(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        self.bounded("get_by_id", self.store.get_by_id(user_id)).await
    }

    /// Overwrite the session pointer (login / logout)
    pub async fn persist(&self, user_id: UserId, token: Option<&str>) -> Result<(), AuthError> {
        self.bounded("set_refresh_token", self.store.set_refresh_token(user_id, token))
            .await
    }

    /// Swap `presented` for `next` only if `presented` is still current.
    pub async fn rotate(
        &self,
        user_id: UserId,
        presented: &str,
        next: &str,
    ) -> Result<bool, AuthError> {
        self.bounded(
            "compare_and_set_refresh_token",
            self.store
                .compare_and_set_refresh_token(user_id, presented, Some(next)),
        )
        .await
    }

    /// Clear the pointer in response to reuse. Returns the resulting state.
    pub async fn revoke(&self, user_id: UserId, state: SessionState) -> Result<SessionState, AuthError> {
        self.persist(user_id, None).await?;
        Ok(state.on_revoke())
    }
}
