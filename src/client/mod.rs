//! Authenticated HTTP client
//!
//! - [`Dispatcher`]: sends calls with the current bearer credential
//! - [`RefreshCoordinator`]: refresh-on-401 with at most one refresh in flight
//! - [`AuthClient`]: cheap-to-clone facade shared by API wrappers and agents

mod account;
mod coordinator;
mod dispatcher;
mod error;
mod request;

pub use account::{MessageResponse, SignInResponse};
pub use coordinator::{RefreshCoordinator, RefreshPhase, SessionEndedCallback};
pub use dispatcher::{Dispatcher, RefreshedTokens};
pub use error::{ClientError, RefreshError};
pub use request::{FileUpload, OutgoingCall};

use std::sync::Arc;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::auth::TokenStore;
use crate::config::ClientConfig;

/// Client for the newsfeed API
///
/// Clones share one token store and one refresh coordinator.
///
/// # Example
///
/// ```no_run
/// use newsfeed_client::client::AuthClient;
/// use newsfeed_client::config::ClientConfig;
///
/// # async fn run() -> Result<(), newsfeed_client::client::ClientError> {
/// let client = AuthClient::from_config(ClientConfig::load())?;
/// client.on_session_ended(|location| println!("please sign in again at {location}")).await;
///
/// client.signin("alice", "secret").await?;
/// let status: serde_json::Value = client.get_json("/api/chat/status/").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthClient {
    coordinator: Arc<RefreshCoordinator>,
    tokens: Arc<TokenStore>,
    config: Arc<ClientConfig>,
}

impl AuthClient {
    /// Creates a client with an explicit token store
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        let config = Arc::new(config);
        let tokens = Arc::new(tokens);
        let dispatcher = Dispatcher::new(config.clone(), tokens.clone())?;
        let coordinator = Arc::new(RefreshCoordinator::new(dispatcher, tokens.clone()));

        Ok(Self {
            coordinator,
            tokens,
            config,
        })
    }

    /// Creates a client whose token store follows the storage settings
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let tokens = TokenStore::from_settings(&config.storage);
        Self::new(config, tokens)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Current refresh phase
    pub fn refresh_phase(&self) -> RefreshPhase {
        self.coordinator.phase()
    }

    /// True when credentials for a session are stored
    pub fn is_signed_in(&self) -> bool {
        self.tokens.has_session()
    }

    /// Sets the callback invoked with the sign-in location when the session ends
    pub async fn on_session_ended<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.coordinator.on_session_ended(callback).await;
    }

    /// Sends a call through the refresh coordinator
    pub async fn execute(&self, call: OutgoingCall) -> Result<Response, ClientError> {
        self.coordinator.execute(call).await
    }

    /// Sends a call and decodes the JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        call: OutgoingCall,
    ) -> Result<T, ClientError> {
        let response = self.execute(call).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// GETs a path and decodes the JSON response body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(OutgoingCall::get(path)).await
    }

    /// POSTs a JSON body and decodes the JSON response body
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(OutgoingCall::post(path).with_json(body)?)
            .await
    }

    /// DELETEs a path and decodes the JSON response body
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(OutgoingCall::delete(path)).await
    }
}
