//! Error types for the credential and session-token lifecycle.
//!
//! Every business-rule failure is a typed value with a stable string code,
//! a numeric API code and an HTTP status. Details of internal and store
//! failures are logged, never rendered.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::account::{StoreError, ValidationError};
use crate::gateway::types::{ApiResponse, error_codes};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Missing or malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Username or email already taken
    #[error("{0} already exists")]
    Conflict(String),

    /// Login or password re-check failed. Deliberately says nothing about why.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, invalid or expired access token, or no refresh token presented
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Refresh token failed verification or no longer matches an active session
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// A superseded refresh token was presented again; the session is revoked
    #[error("Refresh token reuse detected")]
    ReplayDetected,

    #[error("Identity not found")]
    NotFound,

    /// Store unreachable or timed out
    #[error("Identity store unavailable: {0}")]
    TransientStore(String),

    /// Hashing/signing fault or unexpected store failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable error name
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::ReplayDetected => "REPLAY_DETECTED",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::TransientStore(_) => "TRANSIENT_STORE_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Numeric code carried in the `ApiResponse` envelope
    pub fn api_code(&self) -> i32 {
        match self {
            AuthError::Validation(_) => error_codes::INVALID_PARAMETER,
            AuthError::Conflict(_) => error_codes::ALREADY_EXISTS,
            AuthError::InvalidCredentials => error_codes::INVALID_CREDENTIALS,
            AuthError::Unauthorized(_) => error_codes::AUTH_FAILED,
            AuthError::InvalidRefreshToken => error_codes::INVALID_REFRESH_TOKEN,
            AuthError::ReplayDetected => error_codes::REFRESH_TOKEN_REUSED,
            AuthError::NotFound => error_codes::NOT_FOUND,
            AuthError::TransientStore(_) => error_codes::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::Unauthorized(_)
            | AuthError::InvalidRefreshToken
            | AuthError::ReplayDetected => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only store outages are worth an automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::TransientStore(_))
    }

    /// Message safe to send to the caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Conflict(field) => format!("{} already exists", field),
            AuthError::InvalidCredentials => "Invalid username, email or password".to_string(),
            AuthError::Unauthorized(msg) => msg.clone(),
            AuthError::InvalidRefreshToken => "Refresh token is invalid or expired".to_string(),
            AuthError::ReplayDetected => {
                "Refresh token was already used; please log in again".to_string()
            }
            AuthError::NotFound => "User not found".to_string(),
            AuthError::TransientStore(_) => {
                "Service temporarily unavailable, please retry".to_string()
            }
            AuthError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(field) => AuthError::Conflict(field),
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Unavailable(msg) => AuthError::TransientStore(msg),
            StoreError::Database(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(e: ValidationError) -> Self {
        AuthError::Validation(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Internal(detail) => tracing::error!(code = self.code(), "{}", detail),
            AuthError::TransientStore(detail) => tracing::warn!(code = self.code(), "{}", detail),
            _ => tracing::debug!(code = self.code(), "{}", self),
        }
        let body = ApiResponse::<()>::error(self.api_code(), self.public_message());
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(
            AuthError::Validation("x".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Conflict("username".into()).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::ReplayDetected.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::TransientStore("t".into()).http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AuthError::NotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(AuthError::TransientStore("timeout".into()).is_retryable());
        assert!(!AuthError::Internal("x".into()).is_retryable());
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(!AuthError::ReplayDetected.is_retryable());
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            AuthError::from(StoreError::Conflict("email".into())),
            AuthError::Conflict("email".into())
        );
        assert!(matches!(
            AuthError::from(StoreError::Unavailable("down".into())),
            AuthError::TransientStore(_)
        ));
        assert!(matches!(
            AuthError::from(StoreError::Database("boom".into())),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = AuthError::Internal("argon2 params rejected: m_cost".into());
        assert!(!err.public_message().contains("argon2"));
        let err = AuthError::TransientStore("10.0.0.5:5432 refused".into());
        assert!(!err.public_message().contains("5432"));
    }

    #[test]
    fn test_into_response_status() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
