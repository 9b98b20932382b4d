//! Media Accounts - user accounts and session tokens for a media sharing backend
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL connection pool
//! - [`account`] - Identity records and the identity store (PostgreSQL / in-memory)
//! - [`user_auth`] - Password hashing, token codec, refresh-token sessions, auth guard
//! - [`gateway`] - HTTP routes, OpenAPI docs

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod user_auth;

// Convenient re-exports at crate root
pub use account::{IdentityStore, MemoryIdentityStore, PgIdentityStore, PublicUser, UserId};
pub use config::AppConfig;
pub use user_auth::{AuthError, AuthGuard, TokenCodec, UserAuthService};
