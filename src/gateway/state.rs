use std::sync::Arc;

use crate::account::IdentityStore;
use crate::config::AppConfig;
use crate::user_auth::{
    AuthError, AuthGuard, Clock, PasswordHasher, SessionStore, SystemClock, TokenCodec,
    UserAuthService,
};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Register / login / refresh / logout / password and account updates
    pub auth: Arc<UserAuthService>,
    /// Access-token check for protected routes
    pub guard: AuthGuard,
    /// Identity store, for health checks
    pub store: Arc<dyn IdentityStore>,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn IdentityStore>) -> Result<Self, AuthError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build with an explicit clock for token issue and expiry
    pub fn with_clock(
        config: &AppConfig,
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let codec = Arc::new(TokenCodec::with_clock(&config.auth, clock));
        let hasher = PasswordHasher::new(&config.password)?;
        let sessions = SessionStore::new(store.clone(), config.store_timeout());
        let auth = UserAuthService::new(hasher, codec.clone(), sessions)?;

        Ok(Self {
            auth: Arc::new(auth),
            guard: AuthGuard::new(codec),
            store,
        })
    }
}
