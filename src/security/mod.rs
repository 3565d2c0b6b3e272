//! Security helpers for credential handling
//!
//! - Zeroizing string type for access/refresh credentials held in memory
//! - Log-safe rendering of tokens, emails and URLs
//! - Validation of user-supplied sign-in/registration fields

mod sanitizer;
mod secure_string;

pub use sanitizer::{Sanitizer, SanitizerError};
pub use secure_string::SecureString;
