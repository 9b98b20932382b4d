//! Media Accounts - account backend for a media sharing app
//!
//! ```text
//! ┌──────────┐    ┌────────────┐    ┌─────────────────┐    ┌────────────────┐
//! │  Config  │───▶│  Gateway   │───▶│ UserAuthService │───▶│ IdentityStore  │
//! │  (YAML)  │    │ (axum/JWT) │    │ (argon2 + JWT)  │    │ (Postgres/mem) │
//! └──────────┘    └────────────┘    └─────────────────┘    └────────────────┘
//! ```
//!
//! Usage: `media_accounts [--env dev] [--port 8080]`, or `RUN_ENV=prod media_accounts`

use anyhow::Context;
use std::sync::Arc;

use media_accounts::account::{Database, IdentityStore, MemoryIdentityStore, PgIdentityStore};
use media_accounts::config::AppConfig;
use media_accounts::gateway::{self, state::AppState};

fn arg_value(flags: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if flags.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    arg_value(&["--env", "-e"])
        .or_else(|| std::env::var("RUN_ENV").ok())
        .unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    arg_value(&["--port"]).and_then(|p| p.parse().ok())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityStore>> {
    match config.postgres_url.as_deref() {
        Some(url) => {
            let db = Database::connect(url, config.store_timeout())
                .await
                .context("Failed to connect to PostgreSQL")?;
            let store = PgIdentityStore::new(Arc::new(db));
            store
                .init_schema()
                .await
                .context("Failed to initialise users_tb schema")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("postgres_url not set: identities are kept in memory and lost on restart");
            Ok(Arc::new(MemoryIdentityStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).context("Failed to load configuration")?;
    let _log_guard = media_accounts::logging::init_logging(&app_config);

    tracing::info!("Starting Media Accounts in {} mode", env);
    tracing::debug!(auth = ?app_config.auth, "Auth settings");

    let store = build_store(&app_config).await?;
    let state = AppState::new(&app_config, store).context("Failed to build auth service")?;

    // Gateway config from YAML, allow --port override
    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, Arc::new(state))
        .await
        .context("Gateway server error")?;

    Ok(())
}
