//! Knowledge store endpoints
//!
//! Saved feed items are embedded server-side and can be searched by meaning.

use serde::Serialize;

use crate::client::{AuthClient, ClientError, OutgoingCall};
use crate::security::Sanitizer;

const MAX_SUMMARY: usize = 2000;
const MAX_QUERY: usize = 1000;

/// A feed item to save
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KnowledgeItem {
    pub content_id: String,
    pub user_id: String,
    pub platform: String,
    pub summary: String,
    /// Unix seconds
    pub timestamp: i64,
}

/// Semantic search over a user's saved items
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KnowledgeQuery {
    pub user_id: String,
    pub query: String,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl KnowledgeQuery {
    /// Query returning the 3 closest items
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            top_k: 3,
            from_timestamp: None,
            platform: None,
        }
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Only items saved at or after `timestamp` (unix seconds)
    pub fn since(mut self, timestamp: i64) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// Knowledge store API
#[derive(Clone)]
pub struct KnowledgeApi {
    client: AuthClient,
}

impl KnowledgeApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    fn path(&self, endpoint: &str) -> String {
        let config = self.client.config();
        config.service_path(&config.services.knowledge, endpoint)
    }

    /// Saves an item; the backend's acknowledgement is passed through
    pub async fn add_item(&self, item: &KnowledgeItem) -> Result<serde_json::Value, ClientError> {
        Sanitizer::validate_field("content_id", &item.content_id, 255)?;
        Sanitizer::validate_field("user_id", &item.user_id, 255)?;
        Sanitizer::validate_field("summary", &item.summary, MAX_SUMMARY)?;

        let call = OutgoingCall::put(self.path("items/")).with_json(item)?;
        let response = self.client.send_json(call).await?;
        tracing::debug!("Saved {} item {}", item.platform, item.content_id);
        Ok(response)
    }

    /// Searches saved items; matches are passed through as returned
    pub async fn query(&self, query: &KnowledgeQuery) -> Result<serde_json::Value, ClientError> {
        Sanitizer::validate_field("user_id", &query.user_id, 255)?;
        Sanitizer::validate_field("query", &query.query, MAX_QUERY)?;

        let call = OutgoingCall::post(self.path("query/")).with_json(query)?;
        self.client.send_json(call).await
    }
}
