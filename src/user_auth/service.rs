use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::error::AuthError;
use super::password::PasswordHasher;
use super::session::{SessionState, SessionStore};
use super::token::{TokenClaims, TokenCodec};
use crate::account::validation::{check_password, require_non_blank};
use crate::account::{
    Email, HashedPassword, IdentityStore, NewUser, PublicUser, User, UserId, Username,
};
use crate::logging::SECURITY_TARGET;

/// User Registration Request
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Channel One")]
    pub fullname: String,
    #[schema(example = "viewer@example.com")]
    pub email: String,
    #[schema(example = "channel.one")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
    /// URL returned by the upload service
    #[schema(example = "https://cdn.example.com/avatars/42.png")]
    pub avatar: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// User Login Request: either username or email
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "channel.one")]
    pub username: Option<String>,
    #[serde(default)]
    #[schema(example = "viewer@example.com")]
    pub email: Option<String>,
    #[schema(example = "password123")]
    pub password: String,
}

/// Refresh Request (body carrier; the cookie wins when both are present)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[schema(example = "Channel One")]
    pub fullname: String,
    #[schema(example = "viewer@example.com")]
    pub email: String,
}

/// Access + refresh token, always issued and rotated together
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Why a login failed. Logged only; callers always get `InvalidCredentials`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginFailure {
    UnknownIdentity,
    PasswordMismatch,
}

/// Credential and session-token lifecycle.
///
/// Issues a token pair on login, rotates it on refresh, detects refresh-token
/// reuse, clears the session on logout. Changing the password leaves the
/// current refresh token in place: existing sessions stay valid.
pub struct UserAuthService {
    hasher: PasswordHasher,
    codec: Arc<TokenCodec>,
    sessions: SessionStore,
    /// Verified against when the identity is unknown, so both failure paths cost one hash check
    decoy_hash: HashedPassword,
}

fn normalize_login_field(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty())
}

impl UserAuthService {
    pub fn new(
        hasher: PasswordHasher,
        codec: Arc<TokenCodec>,
        sessions: SessionStore,
    ) -> Result<Self, AuthError> {
        let decoy_hash = hasher.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            hasher,
            codec,
            sessions,
            decoy_hash,
        })
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    fn store(&self) -> &Arc<dyn IdentityStore> {
        self.sessions.identities()
    }

    fn mint_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self
            .codec
            .issue_access(user)
            .map_err(|e| AuthError::Internal(format!("Access token: {}", e)))?;
        let refresh_token = self
            .codec
            .issue_refresh(user.user_id)
            .map_err(|e| AuthError::Internal(format!("Refresh token: {}", e)))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Register a new user. No session is opened.
    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser, AuthError> {
        let fullname = require_non_blank("fullname", &req.fullname)?;
        let email = Email::new(&req.email)?;
        let username = Username::new(&req.username)?;
        check_password("password", &req.password)?;
        let avatar = require_non_blank("avatar", &req.avatar)?;
        let cover_image = req
            .cover_image
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        // 1. Hash password (once, here, before the record exists)
        let password_hash = self.hasher.hash_blocking(req.password).await?;

        // 2. Insert; the store enforces username/email uniqueness
        let new_user = NewUser {
            username,
            email,
            fullname,
            avatar,
            cover_image,
            password_hash,
        };
        let user = self
            .sessions
            .bounded("insert", self.store().insert(new_user))
            .await
            .inspect_err(|e| {
                if let AuthError::Conflict(field) = e {
                    tracing::warn!("Registration attempt with existing {}", field);
                }
            })?;

        tracing::info!(user_id = user.user_id, "User registered");
        Ok(user.to_public())
    }

    /// Login user and issue a token pair
    pub async fn login(&self, req: LoginRequest) -> Result<(TokenPair, PublicUser), AuthError> {
        let username = normalize_login_field(req.username);
        let email = normalize_login_field(req.email);
        if username.is_none() && email.is_none() {
            return Err(AuthError::Validation(
                "username or email is required".to_string(),
            ));
        }
        if req.password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        // 1. Resolve identity
        let user = self
            .sessions
            .bounded(
                "find_by_username_or_email",
                self.store()
                    .find_by_username_or_email(username.as_deref(), email.as_deref()),
            )
            .await?;

        // 2. Verify password
        let failure = match &user {
            None => {
                self.hasher
                    .verify_blocking(req.password, self.decoy_hash.clone())
                    .await;
                Some(LoginFailure::UnknownIdentity)
            }
            Some(u) => {
                if self
                    .hasher
                    .verify_blocking(req.password, u.password_hash.clone())
                    .await
                {
                    None
                } else {
                    Some(LoginFailure::PasswordMismatch)
                }
            }
        };

        let user = match (user, failure) {
            (Some(u), None) => u,
            (u, reason) => {
                tracing::warn!(
                    user_id = u.map(|u| u.user_id),
                    reason = ?reason,
                    "Login failed"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        // 3. Mint pair, 4. overwrite the session pointer
        let pair = self.mint_pair(&user)?;
        self.sessions
            .persist(user.user_id, Some(&pair.refresh_token))
            .await?;

        tracing::info!(user_id = user.user_id, "User logged in");
        Ok((pair, user.to_public()))
    }

    /// Rotate a refresh token into a new pair.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        // 1. Token present?
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("Refresh token is required".to_string()))?;

        // 2. Signature + expiry
        let claims = self.codec.verify_refresh(presented).map_err(|e| {
            tracing::debug!("Refresh token rejected: {}", e);
            AuthError::InvalidRefreshToken
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        // 3. Identity still exists?
        let user = self
            .sessions
            .get(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // 4. Compare with the stored pointer
        match SessionState::classify(user.refresh_token.as_deref(), presented) {
            SessionState::Revoked => {
                tracing::info!(user_id, "Refresh token presented for a closed session");
                Err(AuthError::InvalidRefreshToken)
            }
            state @ SessionState::Compromised => {
                let state = self.sessions.revoke(user_id, state).await?;
                tracing::warn!(
                    target: SECURITY_TARGET,
                    user_id,
                    ?state,
                    "Refresh token reuse detected, session revoked"
                );
                Err(AuthError::ReplayDetected)
            }
            SessionState::Active => {
                // 5. Rotate
                let pair = self.mint_pair(&user)?;
                if !self
                    .sessions
                    .rotate(user_id, presented, &pair.refresh_token)
                    .await?
                {
                    tracing::warn!(user_id, "Refresh lost a concurrent rotation");
                    return Err(AuthError::InvalidRefreshToken);
                }
                tracing::debug!(user_id, "Refresh token rotated");
                Ok(pair)
            }
        }
    }

    /// Clear the session. Logging out twice is fine.
    pub async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.sessions.persist(user_id, None).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Replace the password after re-verifying the old one.
    ///
    /// The refresh token is left as is; callers wanting to end other sessions
    /// call `logout` afterwards.
    pub async fn change_password(
        &self,
        user_id: UserId,
        req: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        if req.old_password.is_empty() {
            return Err(AuthError::Validation("old_password is required".to_string()));
        }
        check_password("new_password", &req.new_password)?;

        let user = self.sessions.get(user_id).await?.ok_or(AuthError::NotFound)?;
        if !self
            .hasher
            .verify_blocking(req.old_password, user.password_hash.clone())
            .await
        {
            tracing::warn!(user_id, "Password change rejected: old password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.hasher.hash_blocking(req.new_password).await?;
        self.sessions
            .bounded(
                "update_password_hash",
                self.store().update_password_hash(user_id, &new_hash),
            )
            .await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn current_user(&self, user_id: UserId) -> Result<PublicUser, AuthError> {
        let user = self.sessions.get(user_id).await?.ok_or(AuthError::NotFound)?;
        Ok(user.to_public())
    }

    pub async fn update_account(
        &self,
        user_id: UserId,
        req: UpdateAccountRequest,
    ) -> Result<PublicUser, AuthError> {
        let fullname = require_non_blank("fullname", &req.fullname)?;
        let email = Email::new(&req.email)?;

        let user = self
            .sessions
            .bounded(
                "update_details",
                self.store().update_details(user_id, &fullname, &email),
            )
            .await?;
        Ok(user.to_public())
    }
}
