//! Authentication module - Credential storage
//!
//! Provides the token store that owns the access/refresh credential pair,
//! backed by one of:
//! - OS credential manager (via keyring crate)
//! - JSON file in the user config directory
//! - Process memory

mod backend;
mod token_store;

pub use backend::{CredentialBackend, FileBackend, KeyringBackend, MemoryBackend, StoreError};
pub use token_store::TokenStore;

#[cfg(test)]
pub use backend::MockCredentialBackend;
