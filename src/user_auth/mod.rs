//! User authentication: credentials, token pairs and the refresh-token session.

pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use middleware::{AuthGuard, jwt_auth_middleware};
pub use password::PasswordHasher;
pub use service::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, TokenPair,
    UpdateAccountRequest, UserAuthService,
};
pub use session::{SessionState, SessionStore};
pub use token::{AccessClaims, Clock, ManualClock, RefreshClaims, SystemClock, TokenCodec, TokenKind};
