//! Account flows: sign-in, registration, logout, password reset

use serde::{Deserialize, Serialize};

use super::{AuthClient, ClientError, OutgoingCall};
use crate::security::{Sanitizer, SecureString};

const MAX_USERNAME: usize = 150;
const MAX_PASSWORD: usize = 128;
const MAX_EMAIL: usize = 254;

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct PasswordResetRequest<'a> {
    email: &'a str,
}

/// Sign-in response; both credentials are stored before it is returned
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub access: SecureString,
    pub refresh: SecureString,
    #[serde(default)]
    pub message: String,
}

/// Plain `{ "message": ... }` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

impl AuthClient {
    /// Signs in and stores the returned credential pair
    pub async fn signin(&self, username: &str, password: &str) -> Result<SignInResponse, ClientError> {
        Sanitizer::validate_field("username", username, MAX_USERNAME)?;
        Sanitizer::validate_field("password", password, MAX_PASSWORD)?;

        let call = OutgoingCall::post(&self.config.endpoints.signin)
            .with_json(&SignInRequest { username, password })?;
        let response: SignInResponse = self.send_json(call).await?;

        self.tokens.set_pair(&response.access, &response.refresh);
        tracing::info!(
            "Signed in as {} ({})",
            username,
            Sanitizer::sanitize_token(&response.access)
        );
        Ok(response)
    }

    /// Registers a new account; the account stays inactive until confirmed
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<MessageResponse, ClientError> {
        Sanitizer::validate_field("username", username, MAX_USERNAME)?;
        Sanitizer::validate_field("email", email, MAX_EMAIL)?;
        Sanitizer::validate_field("password", password, MAX_PASSWORD)?;

        let call = OutgoingCall::post(&self.config.endpoints.register).with_json(
            &RegisterRequest {
                username,
                email,
                password,
            },
        )?;
        let response = self.send_json(call).await?;
        tracing::info!("Registered {} <{}>", username, Sanitizer::sanitize_email(email));
        Ok(response)
    }

    /// Revokes the refresh credential server-side and clears local credentials
    ///
    /// Local credentials are cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(refresh) = self.tokens.get_refresh() else {
            self.tokens.clear_all();
            return Ok(());
        };

        let result = match OutgoingCall::post(&self.config.endpoints.logout).with_json(
            &LogoutRequest {
                refresh_token: &refresh,
            },
        ) {
            Ok(call) => self.execute(call).await.map(|_| ()),
            Err(e) => Err(e),
        };

        self.tokens.clear_all();
        match &result {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::warn!("Logout request failed, local credentials cleared: {}", e),
        }
        result
    }

    /// Requests a password reset email
    pub async fn request_password_reset(&self, email: &str) -> Result<MessageResponse, ClientError> {
        Sanitizer::validate_field("email", email, MAX_EMAIL)?;

        let call = OutgoingCall::post(&self.config.endpoints.password_reset)
            .with_json(&PasswordResetRequest { email })?;
        self.send_json(call).await
    }
}
