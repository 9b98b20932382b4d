use axum::{
    Extension, Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse},
};
use std::sync::Arc;

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, session_cookie};
use super::error::AuthError;
use super::service::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, TokenPair,
    UpdateAccountRequest,
};
use super::token::{AccessClaims, TokenClaims, TokenKind};
use crate::account::{PublicUser, UserId};
use crate::gateway::{state::AppState, types::ApiResponse};

type CookieHeaders = AppendHeaders<[(header::HeaderName, String); 2]>;

fn session_cookies(state: &AppState, pair: &TokenPair) -> CookieHeaders {
    let codec = state.auth.codec();
    AppendHeaders([
        (
            header::SET_COOKIE,
            session_cookie(
                ACCESS_COOKIE_NAME,
                &pair.access_token,
                codec.ttl_secs(TokenKind::Access),
            ),
        ),
        (
            header::SET_COOKIE,
            session_cookie(
                REFRESH_COOKIE_NAME,
                &pair.refresh_token,
                codec.ttl_secs(TokenKind::Refresh),
            ),
        ),
    ])
}

fn cleared_cookies() -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME)),
        (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME)),
    ])
}

/// Unpack a JSON body; malformed JSON or a missing field is a validation failure
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AuthError::Validation(format!("Invalid request body: {}", e.body_text())))
}

fn caller_id(claims: &AccessClaims) -> Result<UserId, AuthError> {
    claims
        .user_id()
        .map_err(|_| AuthError::Unauthorized("Invalid access token".to_string()))
}

/// Register a new user
///
/// POST /api/v1/users/register
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<PublicUser>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let req = json_body(payload)?;
    let user = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Login user
///
/// POST /api/v1/users/login
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookies set", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Username or email missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let req = json_body(payload)?;
    let (pair, user) = state.auth.login(req).await?;
    let cookies = session_cookies(&state, &pair);
    let body = AuthResponse {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((cookies, Json(ApiResponse::success(body))))
}

/// Rotate the refresh token
///
/// POST /api/v1/users/refresh-token
///
/// Token is read from the `refreshToken` cookie, or from the JSON body.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body(content = RefreshRequest, description = "Optional when the refreshToken cookie is sent"),
    responses(
        (status = 200, description = "New token pair, session cookies set", body = ApiResponse<TokenPair>),
        (status = 401, description = "Missing, invalid, expired or reused refresh token")
    ),
    tag = "Users"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AuthError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AuthError::Validation(format!("Invalid request body: {}", e)))?
    };
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME).or(from_body.refresh_token);

    let pair = state.auth.refresh(presented.as_deref()).await?;
    let cookies = session_cookies(&state, &pair);
    Ok((cookies, Json(ApiResponse::success(pair))))
}

/// Logout: end the session and clear cookies
///
/// POST /api/v1/users/logout
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, AuthError> {
    state.auth.logout(caller_id(&claims)?).await?;
    Ok((cleared_cookies(), Json(ApiResponse::success("logged out"))))
}

/// Change password
///
/// POST /api/v1/users/change-password
#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "New password rejected"),
        (status = 401, description = "Unauthorized or old password mismatch")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let req = json_body(payload)?;
    state.auth.change_password(caller_id(&claims)?, req).await?;
    Ok(Json(ApiResponse::success("password changed")))
}

/// Current user
///
/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<PublicUser>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state.auth.current_user(caller_id(&claims)?).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Update fullname and email
///
/// PATCH /api/v1/users/update-account
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<PublicUser>),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let req = json_body(payload)?;
    let user = state.auth.update_account(caller_id(&claims)?, req).await?;
    Ok(Json(ApiResponse::success(user)))
}
