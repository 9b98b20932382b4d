//! Account management module
//!
//! Identity records, input normalisation and the identity store
//! (PostgreSQL or in-memory).

pub mod memory;
pub mod models;
pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use memory::MemoryIdentityStore;
pub use models::{HashedPassword, NewUser, PublicUser, User, UserId};
pub use repository::{IdentityStore, PgIdentityStore, StoreError};
pub use validation::{Email, Username, ValidationError};

// Re-export Database from top-level db module
pub use crate::db::Database;
