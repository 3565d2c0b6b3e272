//! Error types for authenticated calls

use reqwest::StatusCode;
use thiserror::Error;

use crate::security::SanitizerError;

/// Why a credential refresh ended the session
///
/// Cloneable because one failure is delivered to every queued call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh credential is stored
    #[error("No refresh credential available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status
    #[error("Refresh rejected with HTTP {status}")]
    Rejected { status: u16 },

    /// The refresh call did not complete
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered without a usable access credential
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),
}

/// Errors returned by [`AuthClient`](super::AuthClient) calls
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Network error before a response was received
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Credentials could not be refreshed; the session is over
    #[error("Session ended: {0}")]
    SessionEnded(#[from] RefreshError),

    /// The refresh this call was waiting on was abandoned before settling
    #[error("Credential refresh was abandoned")]
    RefreshAbandoned,

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request rejected before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] SanitizerError),
}

impl ClientError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// True for a propagated authentication failure
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// True when the error means the user must sign in again
    pub fn is_session_ended(&self) -> bool {
        matches!(self, ClientError::SessionEnded(_))
    }
}
