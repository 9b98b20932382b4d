//! In-memory identity store.
//!
//! Backs the service when no PostgreSQL URL is configured and is the store
//! used by the test suite. Uniqueness is enforced through `DashMap` entry
//! claims and every refresh-token write happens under the record's shard
//! write guard, so conditional updates are atomic per identity.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use super::models::{HashedPassword, NewUser, User, UserId};
use super::repository::{IdentityStore, StoreError};
use super::validation::Email;

pub struct MemoryIdentityStore {
    users: DashMap<UserId, User>,
    by_username: DashMap<String, UserId>,
    by_email: DashMap<String, UserId>,
    next_id: AtomicI64,
    /// Simulated outage: every call fails with `Unavailable`
    unavailable: AtomicBool,
    /// Simulated per-call latency
    latency: Option<Duration>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_username: DashMap::new(),
            by_email: DashMap::new(),
            next_id: AtomicI64::new(1),
            unavailable: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Delay every call by `latency` (exercises caller timeouts)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    async fn gate(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    /// Reserve a unique key in an index; `false` if someone else holds it.
    fn claim(index: &DashMap<String, UserId>, key: &str, user_id: UserId) -> bool {
        match index.entry(key.to_string()) {
            Entry::Occupied(e) => *e.get() == user_id,
            Entry::Vacant(e) => {
                e.insert(user_id);
                true
            }
        }
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        self.gate().await?;
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        self.gate().await?;
        let by_name = username.and_then(|u| self.by_username.get(u).map(|id| *id));
        let by_mail = email.and_then(|e| self.by_email.get(e).map(|id| *id));
        // Lowest id first, matching the SQL ORDER BY
        let user_id = match (by_name, by_mail) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Ok(user_id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.gate().await?;
        let user_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        if !Self::claim(&self.by_username, user.username.as_str(), user_id) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if !Self::claim(&self.by_email, user.email.as_str(), user_id) {
            self.by_username.remove(user.username.as_str());
            return Err(StoreError::Conflict("email".to_string()));
        }

        let now = Utc::now();
        let record = User {
            user_id,
            username: user.username.into_string(),
            email: user.email.into_string(),
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user_id, record.clone());
        Ok(record)
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        self.gate().await?;
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.refresh_token = token.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.gate().await?;
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        user.refresh_token = new.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        hash: &HashedPassword,
    ) -> Result<(), StoreError> {
        self.gate().await?;
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.password_hash = hash.clone();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_details(
        &self,
        user_id: UserId,
        fullname: &str,
        email: &Email,
    ) -> Result<User, StoreError> {
        self.gate().await?;
        let old_email = self
            .users
            .get(&user_id)
            .map(|u| u.email.clone())
            .ok_or(StoreError::NotFound)?;

        if old_email != email.as_str() && !Self::claim(&self.by_email, email.as_str(), user_id) {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let Some(mut user) = self.users.get_mut(&user_id) else {
            self.by_email.remove(email.as_str());
            return Err(StoreError::NotFound);
        };
        user.fullname = fullname.to_string();
        user.email = email.as_str().to_string();
        user.updated_at = Utc::now();
        let updated = user.clone();
        drop(user);

        if old_email != email.as_str() {
            self.by_email.remove(&old_email);
        }
        Ok(updated)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.gate().await
    }
}
