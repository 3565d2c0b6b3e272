//! Trending hashtags that seed personalized content streams

use crate::client::{AuthClient, ClientError, OutgoingCall};

/// Hashtag feed API
#[derive(Clone)]
pub struct FeedApi {
    client: AuthClient,
}

impl FeedApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// Currently trending hashtags, in the shape the crawler reports them
    pub async fn top_hashtags(&self) -> Result<serde_json::Value, ClientError> {
        let config = self.client.config();
        let path = config.service_path(&config.services.hashtags, "top-hashtags/");
        self.client.send_json(OutgoingCall::get(path)).await
    }
}
