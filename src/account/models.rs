//! Data models for user accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use super::validation::{Email, Username};

/// Stable identity id (`users_tb.user_id`)
pub type UserId = i64;

/// PHC-format password hash produced by the password hasher.
///
/// There is no public constructor from an arbitrary string, so a plaintext
/// credential cannot be handed to the store by mistake and a stored hash is
/// never hashed a second time.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a value that already is a hash: hasher output or a stored column.
    pub(crate) fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(<redacted>)")
    }
}

/// Identity record as held by the identity store
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub fullname: String,
    /// Opaque URL supplied by the upload collaborator
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: HashedPassword,
    /// The single currently valid refresh token, `None` when no session is active
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_active_session(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Projection safe to return to callers
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: self.user_id,
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Identity record without credential or session fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicUser {
    #[schema(example = 42)]
    pub user_id: UserId,
    #[schema(example = "channel.one")]
    pub username: String,
    #[schema(example = "viewer@example.com")]
    pub email: String,
    #[schema(example = "Channel One")]
    pub fullname: String,
    #[schema(example = "https://cdn.example.com/avatars/42.png")]
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new identity record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: HashedPassword,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            user_id: 7,
            username: "channel.one".to_string(),
            email: "viewer@example.com".to_string(),
            fullname: "Channel One".to_string(),
            avatar: "https://cdn.example.com/a.png".to_string(),
            cover_image: None,
            password_hash: HashedPassword::from_phc("$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".into()),
            refresh_token: Some("rt".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_projection_drops_secrets() {
        let json = serde_json::to_value(sample().to_public()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["username"], "channel.one");
    }

    #[test]
    fn test_hash_debug_redacted() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("argon2id"));
        assert!(sample().has_active_session());
    }
}
