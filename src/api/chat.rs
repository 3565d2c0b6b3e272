//! Chat assistant endpoints
//!
//! All calls go through [`AuthClient`], so expired access credentials are
//! refreshed transparently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{AuthClient, ClientError, OutgoingCall};
use crate::security::Sanitizer;

#[derive(Serialize)]
struct MessageRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

/// `GET sessions/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionList {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub sessions: Vec<serde_json::Value>,
    #[serde(default)]
    pub count: usize,
}

/// `POST sessions/new/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewSession {
    #[serde(default)]
    pub success: bool,
    pub session_id: String,
    /// ISO 8601 creation time as sent by the server
    pub created_at: Option<String>,
}

impl NewSession {
    /// Parsed creation time, if present and RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// `GET sessions/{id}/history/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionHistory {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session_info: serde_json::Value,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub count: usize,
}

/// `DELETE sessions/{id}/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArchiveResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// One task the assistant can handle
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SupportedTask {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub status: String,
}

/// `GET capabilities/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Capabilities {
    pub system_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub supported_tasks: Vec<SupportedTask>,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub features: HashMap<String, bool>,
}

/// `POST session/reset/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionReset {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub session_id: String,
}

/// `GET status/` response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SystemStatus {
    pub system: String,
    pub orchestrator: Option<String>,
    #[serde(default)]
    pub agents: HashMap<String, String>,
    #[serde(default)]
    pub components: HashMap<String, String>,
}

impl SystemStatus {
    pub fn is_online(&self) -> bool {
        self.system == "online"
    }
}

/// Chat assistant API
#[derive(Clone)]
pub struct ChatApi {
    client: AuthClient,
}

impl ChatApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    fn path(&self, endpoint: &str) -> String {
        let config = self.client.config();
        config.service_path(&config.services.chat, endpoint)
    }

    /// Sends a message; the orchestrator reply shape is passed through as-is
    pub async fn send_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        self.client
            .post_json(
                &self.path("message/"),
                &MessageRequest {
                    message,
                    session_id,
                },
            )
            .await
    }

    /// Lists the user's sessions, most recent first
    pub async fn sessions(&self, limit: Option<u32>) -> Result<SessionList, ClientError> {
        let mut call = OutgoingCall::get(self.path("sessions/"));
        if let Some(limit) = limit {
            call = call.with_query("limit", limit);
        }
        self.client.send_json(call).await
    }

    /// Starts a new session with optional context
    pub async fn new_session(
        &self,
        context: Option<serde_json::Value>,
    ) -> Result<NewSession, ClientError> {
        let body = serde_json::json!({
            "context": context.unwrap_or_else(|| serde_json::json!({})),
        });
        self.client
            .send_json(OutgoingCall::post(self.path("sessions/new/")).with_body(body))
            .await
    }

    /// Loads the conversation history of a session
    pub async fn session_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<SessionHistory, ClientError> {
        Sanitizer::validate_path_segment("session_id", session_id)?;
        let mut call = OutgoingCall::get(self.path(&format!("sessions/{session_id}/history/")));
        if let Some(limit) = limit {
            call = call.with_query("limit", limit);
        }
        self.client.send_json(call).await
    }

    /// Archives a session
    pub async fn archive_session(&self, session_id: &str) -> Result<ArchiveResult, ClientError> {
        Sanitizer::validate_path_segment("session_id", session_id)?;
        self.client
            .delete_json(&self.path(&format!("sessions/{session_id}/")))
            .await
    }

    /// Tasks, languages and features the assistant supports
    pub async fn capabilities(&self) -> Result<Capabilities, ClientError> {
        self.client
            .get_json(&self.path("capabilities/"))
            .await
    }

    /// Starts over with a fresh session id
    pub async fn reset_session(
        &self,
        session_id: Option<&str>,
    ) -> Result<SessionReset, ClientError> {
        let body = match session_id {
            Some(id) => serde_json::json!({ "session_id": id }),
            None => serde_json::json!({}),
        };
        self.client
            .send_json(OutgoingCall::post(self.path("session/reset/")).with_body(body))
            .await
    }

    /// Backend health and component status
    pub async fn system_status(&self) -> Result<SystemStatus, ClientError> {
        self.client
            .get_json(&self.path("status/"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::config::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_api(server: &MockServer) -> ChatApi {
        let client =
            AuthClient::new(ClientConfig::with_base_url(server.uri()), TokenStore::in_memory())
                .unwrap();
        client.tokens().set_pair("tok1", "ref1");
        ChatApi::new(client)
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/message/"))
            .and(header("Authorization", "Bearer tok1"))
            .and(body_json(json!({ "message": "Find #machinelearning videos" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "Here you go", "session_id": "s1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = chat_api(&server)
            .send_message("Find #machinelearning videos", None)
            .await
            .unwrap();
        assert_eq!(reply["session_id"], "s1");
    }

    #[tokio::test]
    async fn test_sessions_with_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/sessions/"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "sessions": [{ "session_id": "s1" }, { "session_id": "s2" }],
                "count": 2
            })))
            .mount(&server)
            .await;

        let list = chat_api(&server).sessions(Some(5)).await.unwrap();
        assert!(list.success);
        assert_eq!(list.count, 2);
        assert_eq!(list.sessions[1]["session_id"], "s2");
    }

    #[tokio::test]
    async fn test_new_session_parses_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/sessions/new/"))
            .and(body_json(json!({ "context": {} })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "session_id": "abc123",
                "created_at": "2024-01-15T10:00:00.123456+00:00"
            })))
            .mount(&server)
            .await;

        let session = chat_api(&server).new_session(None).await.unwrap();
        assert_eq!(session.session_id, "abc123");
        let created = session.created_at().unwrap();
        assert_eq!(created.to_rfc3339(), "2024-01-15T10:00:00.123456+00:00");
    }

    #[tokio::test]
    async fn test_archive_session_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/chat/sessions/missing/"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Session not found" })),
            )
            .mount(&server)
            .await;

        let err = chat_api(&server)
            .archive_session("missing")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_system_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/status/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "system": "online",
                "orchestrator": "initialized",
                "agents": { "intent_classifier": "ready" },
                "components": { "neo4j": "not_configured" }
            })))
            .mount(&server)
            .await;

        let status = chat_api(&server).system_status().await.unwrap();
        assert!(status.is_online());
        assert_eq!(status.components["neo4j"], "not_configured");
    }

    #[tokio::test]
    async fn test_session_id_cannot_escape_its_segment() {
        let server = MockServer::start().await;
        let chat = chat_api(&server);

        let err = chat.archive_session("../../auth/logout").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));

        let err = chat.session_history("s1/history", None).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_history_with_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/sessions/session_7_1700000000/history/"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "session_info": { "title": "ML videos" },
                "messages": [{ "role": "user", "content": "hi" }],
                "count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let history = chat_api(&server)
            .session_history("session_7_1700000000", Some(10))
            .await
            .unwrap();
        assert_eq!(history.count, 1);
        assert_eq!(history.session_info["title"], "ML videos");
    }

    #[tokio::test]
    async fn test_capabilities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/capabilities/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "system_name": "ReelsAI Chat Assistant",
                "version": "1.0.0",
                "supported_tasks": [{
                    "name": "general_chat",
                    "description": "General conversation and system help",
                    "examples": ["Hello, what can you do?"],
                    "status": "fully_implemented"
                }],
                "supported_languages": ["English", "Vietnamese"],
                "features": { "session_management": true }
            })))
            .mount(&server)
            .await;

        let caps = chat_api(&server).capabilities().await.unwrap();
        assert_eq!(caps.supported_tasks[0].name, "general_chat");
        assert_eq!(caps.supported_languages.len(), 2);
        assert_eq!(caps.features.get("session_management"), Some(&true));
    }

    #[tokio::test]
    async fn test_reset_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/session/reset/"))
            .and(body_json(json!({ "session_id": "old" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "New chat session created",
                "session_id": "session_7_1700000000",
                "user_id": "7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reset = chat_api(&server).reset_session(Some("old")).await.unwrap();
        assert!(reset.success);
        assert_eq!(reset.session_id, "session_7_1700000000");
    }
}
