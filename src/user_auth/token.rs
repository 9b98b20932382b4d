//! Signed, expiring bearer tokens (HS256 JWS).
//!
//! Two token classes with independent secrets and lifetimes:
//! - access: short-lived, carries identity id and display claims, never stored
//! - refresh: long-lived, carries identity id and a random `jti`, the single
//!   valid copy is held on the identity record
//!
//! Expiry is checked against an injected [`Clock`] with second granularity
//! and no leeway.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use utoipa::ToSchema;

use crate::account::{User, UserId};
use crate::config::{AuthConfig, MAX_TOKEN_TTL_SECS};

/// Source of "now" in unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Settable clock for deterministic expiry
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verification failures. None of them carry token or key material.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token could not be signed")]
    Signing,
}

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct AccessClaims {
    pub sub: String, // Subject (user_id as string)
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Makes every refresh token unique, even two minted in the same second
    pub jti: String,
}

/// Claims with an identity subject and an expiry
pub trait TokenClaims: Serialize + DeserializeOwned {
    fn subject(&self) -> &str;
    fn expires_at(&self) -> i64;

    fn user_id(&self) -> Result<UserId, TokenError> {
        self.subject().parse().map_err(|_| TokenError::Malformed)
    }
}

impl TokenClaims for AccessClaims {
    fn subject(&self) -> &str {
        &self.sub
    }
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl TokenClaims for RefreshClaims {
    fn subject(&self) -> &str {
        &self.sub
    }
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenKeys {
    fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            // Validated configs are always under the ceiling
            ttl_secs: i64::try_from(ttl_secs.min(MAX_TOKEN_TTL_SECS)).unwrap_or(i64::MAX),
        }
    }
}

pub struct TokenCodec {
    access: TokenKeys,
    refresh: TokenKeys,
    clock: Arc<dyn Clock>,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `verify` against our clock
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            access: TokenKeys::new(&config.access_token_secret, config.access_token_ttl_secs),
            refresh: TokenKeys::new(&config.refresh_token_secret, config.refresh_token_ttl_secs),
            clock,
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &TokenKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        self.keys(kind).ttl_secs
    }

    /// Sign arbitrary claims with the key of `kind`
    pub fn sign<C: Serialize>(&self, kind: TokenKind, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding).map_err(|e| {
            tracing::error!("Failed to sign {:?} token: {}", kind, e);
            TokenError::Signing
        })
    }

    /// Check signature, structure and expiry; return the claims
    pub fn verify<C: TokenClaims>(&self, kind: TokenKind, token: &str) -> Result<C, TokenError> {
        let data = decode::<C>(token, &self.keys(kind).decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.expires_at() <= self.clock.now() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        let iat = self.clock.now();
        let claims = AccessClaims {
            sub: user.user_id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            iat,
            exp: iat.saturating_add(self.access.ttl_secs),
        };
        self.sign(TokenKind::Access, &claims)
    }

    pub fn issue_refresh(&self, user_id: UserId) -> Result<String, TokenError> {
        let iat = self.clock.now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat,
            exp: iat.saturating_add(self.refresh.ttl_secs),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.sign(TokenKind::Refresh, &claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::HashedPassword;

    const T0: i64 = 1_700_000_000;

    fn config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-a".to_string(),
            refresh_token_secret: "refresh-secret-b".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 864_000,
        }
    }

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (TokenCodec::with_clock(&config(), clock.clone()), clock)
    }

    fn user() -> User {
        User {
            user_id: 42,
            username: "channel.one".to_string(),
            email: "viewer@example.com".to_string(),
            fullname: "Channel One".to_string(),
            avatar: "https://cdn.example.com/a.png".to_string(),
            cover_image: None,
            password_hash: HashedPassword::from_phc("$argon2id$x".to_string()),
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_roundtrip_claims() {
        let (codec, _) = codec();
        let token = codec.issue_access(&user()).unwrap();
        let claims = codec.verify_access(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "channel.one");
        assert_eq!(claims.iat, T0);
        assert_eq!(claims.exp, T0 + 900);
        assert_eq!(claims.user_id(), Ok(42));
    }

    #[test]
    fn test_expired_after_ttl() {
        let (codec, clock) = codec();
        let token = codec.issue_access(&user()).unwrap();

        clock.advance(899);
        assert!(codec.verify_access(&token).is_ok());

        clock.advance(1);
        assert_eq!(codec.verify_access(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let (codec, _) = codec();
        let other = TokenCodec::with_clock(
            &AuthConfig {
                access_token_secret: "some-other-secret".to_string(),
                ..config()
            },
            Arc::new(ManualClock::new(T0)),
        );
        let token = other.issue_access(&user()).unwrap();
        assert_eq!(
            codec.verify_access(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_token_classes_do_not_cross() {
        let (codec, _) = codec();
        let refresh = codec.issue_refresh(42).unwrap();
        // refresh token presented where an access token is expected
        assert_eq!(
            codec.verify_access(&refresh),
            Err(TokenError::InvalidSignature)
        );

        let access = codec.issue_access(&user()).unwrap();
        assert_eq!(
            codec.verify_refresh(&access),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_oversized_ttl_is_clamped_not_wrapped() {
        let codec = TokenCodec::with_clock(
            &AuthConfig {
                refresh_token_ttl_secs: u64::MAX,
                ..config()
            },
            Arc::new(ManualClock::new(T0)),
        );
        assert_eq!(codec.ttl_secs(TokenKind::Refresh), MAX_TOKEN_TTL_SECS as i64);

        let token = codec.issue_refresh(1).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();
        assert_eq!(claims.exp, T0 + MAX_TOKEN_TTL_SECS as i64);
    }

    #[test]
    fn test_malformed_input() {
        let (codec, _) = codec();
        for bad in ["", "abc", "a.b.c", "not.a.jwt.at.all"] {
            assert_eq!(
                codec.verify_access(bad),
                Err(TokenError::Malformed),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_refresh_tokens_unique_within_same_second() {
        let (codec, _) = codec();
        let a = codec.issue_refresh(42).unwrap();
        let b = codec.issue_refresh(42).unwrap();
        assert_ne!(a, b);
        let claims = codec.verify_refresh(&a).unwrap();
        assert_eq!(claims.exp - claims.iat, 864_000);
    }

    #[test]
    fn test_token_is_url_safe() {
        let (codec, _) = codec();
        let token = codec.issue_access(&user()).unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_error_display_has_no_token_material() {
        assert_eq!(TokenError::InvalidSignature.to_string(), "token signature is invalid");
    }
}
