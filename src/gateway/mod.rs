pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::{handlers as users, jwt_auth_middleware};
use state::AppState;

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public user routes
    // ==========================================================================
    let public_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/refresh-token", post(users::refresh_token));

    // ==========================================================================
    // Protected user routes (access token required)
    // ==========================================================================
    let protected_routes = Router::new()
        .route("/logout", post(users::logout))
        .route("/change-password", post(users::change_password))
        .route("/me", get(users::current_user))
        .route("/update-account", patch(users::update_account))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/users", public_routes.merge(protected_routes))
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.inspect_err(|e| {
        tracing::error!("Failed to bind to {}: {} (port may already be in use)", addr, e);
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app).await
}
