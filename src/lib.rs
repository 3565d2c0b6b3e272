//! Newsfeed client - Authenticated access to the AI newsfeed backend
//!
//! A client library for the newsfeed/chat REST API, which issues short-lived
//! JWT access credentials paired with longer-lived refresh credentials.
//!
//! ## Features
//!
//! - Bearer credential attached to every call
//! - Transparent refresh on 401, with at most one refresh call in flight
//! - Each call replayed at most once after a refresh
//! - Credential storage in the OS keyring, a JSON file, or memory
//! - Session-ended callback carrying the sign-in location
//! - Typed chat, knowledge-store, hashtag and video-analysis endpoints
//! - A background polling agent
//!
//! ## Architecture
//!
//! - **Auth**: Token store and its durable backends
//! - **Client**: Dispatcher, refresh coordinator and the `AuthClient` facade
//! - **Api**: Typed wrappers over authenticated endpoints
//! - **Agents**: Background polling
//! - **Security**: Zeroizing secrets and log sanitization

pub mod agents;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod security;

pub use client::{AuthClient, ClientError, OutgoingCall, RefreshError, RefreshPhase};
pub use config::ClientConfig;

use tracing_subscriber::EnvFilter;

/// Initializes logging from `RUST_LOG`, defaulting to debug for this crate
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,newsfeed_client=debug"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
