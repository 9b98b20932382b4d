use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::cookie::{ACCESS_COOKIE_NAME, bearer_token, get_cookie};
use super::error::AuthError;
use super::token::{AccessClaims, TokenCodec, TokenError};
use crate::gateway::state::AppState;

/// Access-token check for protected routes. Stateless: never reads the store,
/// so an access token stays usable until it expires even after logout.
#[derive(Clone)]
pub struct AuthGuard {
    codec: Arc<TokenCodec>,
}

impl AuthGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AccessClaims, AuthError> {
        // 1. Cookie first, then Bearer header
        let token = get_cookie(headers, ACCESS_COOKIE_NAME)
            .or_else(|| bearer_token(headers).map(str::to_string))
            .ok_or_else(|| AuthError::Unauthorized("Missing access token".to_string()))?;

        // 2. Verify with the access key
        self.codec.verify_access(&token).map_err(|e| {
            let msg = match e {
                TokenError::Expired => "Access token expired",
                _ => "Invalid access token",
            };
            AuthError::Unauthorized(msg.to_string())
        })
    }
}

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = state.guard.authenticate(request.headers())?;

    // 3. Inject claims for handlers
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{HashedPassword, User};
    use crate::config::AuthConfig;
    use crate::user_auth::token::ManualClock;
    use axum::http::{HeaderValue, header};
    use chrono::Utc;

    fn setup() -> (AuthGuard, Arc<TokenCodec>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let codec = Arc::new(TokenCodec::with_clock(
            &AuthConfig {
                access_token_secret: "guard-access".to_string(),
                refresh_token_secret: "guard-refresh".to_string(),
                access_token_ttl_secs: 60,
                refresh_token_ttl_secs: 3600,
            },
            clock.clone(),
        ));
        (AuthGuard::new(codec.clone()), codec, clock)
    }

    fn user(id: i64) -> User {
        User {
            user_id: id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            fullname: "User".to_string(),
            avatar: "https://cdn.example.com/a.png".to_string(),
            cover_image: None,
            password_hash: HashedPassword::from_phc("$argon2id$x".to_string()),
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    #[test]
    fn test_missing_token() {
        let (guard, _, _) = setup();
        assert!(matches!(
            guard.authenticate(&HeaderMap::new()),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_bearer_accepted() {
        let (guard, codec, _) = setup();
        let token = codec.issue_access(&user(1)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, bearer(&token));
        assert_eq!(guard.authenticate(&headers).unwrap().sub, "1");
    }

    #[test]
    fn test_cookie_preferred_over_bearer() {
        let (guard, codec, _) = setup();
        let cookie_token = codec.issue_access(&user(1)).unwrap();
        let header_token = codec.issue_access(&user(2)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, bearer(&header_token));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("accessToken={}", cookie_token)).unwrap(),
        );
        assert_eq!(guard.authenticate(&headers).unwrap().sub, "1");
    }

    #[test]
    fn test_expired_and_refresh_tokens_rejected() {
        let (guard, codec, clock) = setup();

        let refresh = codec.issue_refresh(1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, bearer(&refresh));
        assert!(guard.authenticate(&headers).is_err());

        let access = codec.issue_access(&user(1)).unwrap();
        headers.insert(header::AUTHORIZATION, bearer(&access));
        clock.advance(60);
        assert_eq!(
            guard.authenticate(&headers).unwrap_err(),
            AuthError::Unauthorized("Access token expired".to_string())
        );
    }
}
