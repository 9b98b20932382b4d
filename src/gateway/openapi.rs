//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::{Modify, OpenApi};

use crate::account::PublicUser;
use crate::gateway::handlers::HealthResponse;
use crate::user_auth::{
    AccessClaims, AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest,
    RegisterRequest, TokenPair, UpdateAccountRequest,
};

/// Access token, as a Bearer header or the `accessToken` cookie
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "accessToken",
                    "HttpOnly access token cookie set by login and refresh-token",
                ))),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Media Accounts API",
        version = "1.0.0",
        description = "User accounts and session tokens for the media sharing backend.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        // Public
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::refresh_token,
        // Access token required
        crate::user_auth::handlers::logout,
        crate::user_auth::handlers::change_password,
        crate::user_auth::handlers::current_user,
        crate::user_auth::handlers::update_account,
    ),
    components(
        schemas(
            HealthResponse,
            PublicUser,
            AccessClaims,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            ChangePasswordRequest,
            UpdateAccountRequest,
            TokenPair,
            AuthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Registration, login and session tokens"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Media Accounts API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_user_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/api/v1/health",
            "/api/v1/users/register",
            "/api/v1/users/login",
            "/api/v1/users/refresh-token",
            "/api/v1/users/logout",
            "/api/v1/users/change-password",
            "/api/v1/users/me",
            "/api/v1/users/update-account",
        ] {
            assert!(paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_security_schemes_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.security_schemes.contains_key("cookie_auth"));
    }
}
