//! Identity store: the durable record holding credentials and the session pointer.
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::models::{HashedPassword, NewUser, User, UserId};
use super::validation::Email;
use crate::db::{Database, SafeRow};

/// Identity store failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Unique constraint hit; carries the field name (`username` / `email`)
    #[error("{0} already exists")]
    Conflict(String),

    #[error("Identity not found")]
    NotFound,

    /// Store unreachable or timed out; safe to retry
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let constraint = db.constraint().unwrap_or_default();
                let field = if constraint.contains("email") {
                    "email"
                } else if constraint.contains("username") {
                    "username"
                } else {
                    "username or email"
                };
                StoreError::Conflict(field.to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Operations the credential core needs from the account store.
///
/// Refresh-token writes are single atomic statements keyed by `user_id`;
/// `compare_and_set_refresh_token` is the conditional form used for rotation.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Match on either field; `None` fields are ignored.
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Fails with `Conflict` when the username or email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Unconditional overwrite. `None` clears the session.
    async fn set_refresh_token(&self, user_id: UserId, token: Option<&str>)
    -> Result<(), StoreError>;

    /// Replace the stored token only if it still equals `expected`.
    /// Returns `false` when another writer got there first.
    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn update_password_hash(
        &self,
        user_id: UserId,
        hash: &HashedPassword,
    ) -> Result<(), StoreError>;

    async fn update_details(
        &self,
        user_id: UserId,
        fullname: &str,
        email: &Email,
    ) -> Result<User, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "user_id, username, email, fullname, avatar, cover_image, \
                            password_hash, refresh_token, created_at, updated_at";

/// PostgreSQL-backed identity store (`users_tb`)
pub struct PgIdentityStore {
    db: Arc<Database>,
}

impl PgIdentityStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create `users_tb` if it does not exist
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users_tb (
                user_id       BIGSERIAL PRIMARY KEY,
                username      VARCHAR(30)  NOT NULL,
                email         VARCHAR(254) NOT NULL,
                fullname      VARCHAR(128) NOT NULL,
                avatar        TEXT         NOT NULL,
                cover_image   TEXT,
                password_hash TEXT         NOT NULL,
                refresh_token TEXT,
                created_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
                updated_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
                CONSTRAINT users_tb_username_key UNIQUE (username),
                CONSTRAINT users_tb_email_key UNIQUE (email)
            )
            "#,
        )
        .execute(self.db.pool())
        .await?;

        tracing::info!("users_tb schema ready");
        Ok(())
    }

    /// Convert a database row to User.
    fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, sqlx::Error> {
        Ok(User {
            user_id: row.require("user_id")?,
            username: row.require("username")?,
            email: row.require("email")?,
            fullname: row.require("fullname")?,
            avatar: row.require("avatar")?,
            cover_image: row.try_get_log("cover_image").flatten(),
            password_hash: HashedPassword::from_phc(row.require("password_hash")?),
            refresh_token: row.try_get_log("refresh_token").flatten(),
            created_at: row.require("created_at")?,
            updated_at: row.require("updated_at")?,
        })
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_tb WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::row_to_user).transpose()?)
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        // `col = NULL` never matches, so an absent field drops out of the OR
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_tb WHERE username = $1 OR email = $2 \
             ORDER BY user_id LIMIT 1",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::row_to_user).transpose()?)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users_tb (username, email, fullname, avatar, cover_image, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.fullname)
        .bind(&user.avatar)
        .bind(user.cover_image.as_deref())
        .bind(user.password_hash.as_str())
        .fetch_one(self.db.pool())
        .await?;

        Ok(Self::row_to_user(&row)?)
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users_tb
            SET refresh_token = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users_tb
            SET refresh_token = $3, updated_at = NOW()
            WHERE user_id = $1 AND refresh_token = $2
            "#,
        )
        .bind(user_id)
        .bind(expected)
        .bind(new)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        hash: &HashedPassword,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users_tb
            SET password_hash = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(hash.as_str())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_details(
        &self,
        user_id: UserId,
        fullname: &str,
        email: &Email,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users_tb
            SET fullname = $2, email = $3, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(fullname)
        .bind(email.as_str())
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(Self::row_to_user(&row)?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.health_check().await?;
        Ok(())
    }
}
