//! Request dispatcher - sends calls with the current access credential

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;

use super::error::{ClientError, RefreshError};
use super::request::OutgoingCall;
use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::security::{Sanitizer, SecureString};

/// Refresh endpoint response
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: Option<String>,
    /// Present when the backend rotates refresh credentials
    refresh: Option<String>,
}

/// Credentials returned by a successful refresh
#[derive(Debug)]
pub struct RefreshedTokens {
    pub access: SecureString,
    pub refresh: Option<SecureString>,
}

/// Uniform entry point for outbound calls
///
/// Attaches `Authorization: Bearer <access>` when an access credential is
/// stored. Does not interpret responses.
pub struct Dispatcher {
    client: Client,
    config: Arc<ClientConfig>,
    tokens: Arc<TokenStore>,
}

impl Dispatcher {
    pub fn new(config: Arc<ClientConfig>, tokens: Arc<TokenStore>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Sends a call, reading the access credential at send time
    pub async fn send(&self, call: &OutgoingCall) -> Result<Response, ClientError> {
        let url = self.config.url_for(call.path());
        tracing::debug!(
            "{} {}{}",
            call.method(),
            Sanitizer::sanitize_url(&url),
            if call.is_retried() { " (retry)" } else { "" }
        );

        let mut request = self.client.request(call.method().clone(), &url);

        if let Some(access) = self.tokens.get_access() {
            request = request.header(AUTHORIZATION, access.bearer());
        }
        for (name, value) in call.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if !call.query().is_empty() {
            request = request.query(call.query());
        }
        if let Some(body) = call.body() {
            request = request.json(body);
        }
        if let Some(upload) = call.upload() {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.mime)?;
            request = request.multipart(Form::new().part(upload.field.clone(), part));
        }

        let response = request.send().await?;
        tracing::debug!("Response status: {}", response.status());
        Ok(response)
    }

    /// Exchanges a refresh credential for a new access credential
    ///
    /// Sent without a bearer header. Any non-success status is a rejection.
    pub async fn refresh_access(
        &self,
        refresh: &SecureString,
    ) -> Result<RefreshedTokens, RefreshError> {
        let url = self.config.url_for(&self.config.endpoints.refresh);
        tracing::debug!("Refreshing access credential at {}", Sanitizer::sanitize_url(&url));

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "refresh": refresh.as_str() }))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Refresh request rejected: {}", status);
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let data: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        let access = data
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RefreshError::InvalidResponse("missing access credential".into()))?;

        Ok(RefreshedTokens {
            access: SecureString::new(access),
            refresh: data.refresh.filter(|t| !t.is_empty()).map(SecureString::new),
        })
    }
}
