//! Gateway types module
//!
//! - [`response`]: Response envelope and error codes

pub mod response;

// Re-export commonly used types at module root
pub use response::{ApiResponse, error_codes};
