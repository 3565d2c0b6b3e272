//! Video analysis endpoints: transcript and summary of an uploaded clip

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client::{AuthClient, ClientError, FileUpload, OutgoingCall};
use crate::security::{Sanitizer, SanitizerError};

/// A finished analysis
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VideoAnalysis {
    pub id: i64,
    pub video_url: Option<String>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub detected_language: String,
    #[serde(default)]
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Video analysis API
#[derive(Clone)]
pub struct VideoApi {
    client: AuthClient,
}

impl VideoApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    fn path(&self, endpoint: &str) -> String {
        let config = self.client.config();
        config.service_path(&config.services.video_analysis, endpoint)
    }

    /// Uploads a clip and waits for its transcript and summary
    pub async fn analyze(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<VideoAnalysis, ClientError> {
        Sanitizer::validate_field("file_name", file_name, 255)?;
        if bytes.is_empty() {
            return Err(SanitizerError::EmptyInput("video").into());
        }

        tracing::info!("Uploading {} ({} bytes) for analysis", file_name, bytes.len());
        let call = OutgoingCall::post(self.path("analyze/")).with_upload(FileUpload {
            field: "video_file".to_string(),
            file_name: file_name.to_string(),
            mime: mime_for(file_name).to_string(),
            bytes,
        });
        self.client.send_json(call).await
    }

    /// All analyses of the signed-in user
    pub async fn history(&self) -> Result<Vec<VideoAnalysis>, ClientError> {
        self.client.get_json(&self.path("history/")).await
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::config::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn video_api(server: &MockServer) -> VideoApi {
        let client =
            AuthClient::new(ClientConfig::with_base_url(server.uri()), TokenStore::in_memory())
                .unwrap();
        client.tokens().set_pair("tok1", "ref1");
        VideoApi::new(client)
    }

    fn analysis_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "transcript": "hello world",
            "detected_language": "en",
            "summary": "A greeting",
            "video_url": "http://localhost/media/videos/clip.mp4",
            "created_at": "2024-01-15T10:00:00.123456Z"
        })
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("clip.MP4"), "video/mp4");
        assert_eq!(mime_for("clip.mov"), "video/quicktime");
        assert_eq!(mime_for("clip"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_analyze_uploads_video_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/video-analysis/analyze/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(analysis_json(7)))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = video_api(&server)
            .analyze("clip.mp4", b"fake video bytes".to_vec())
            .await
            .unwrap();

        assert_eq!(analysis.id, 7);
        assert_eq!(analysis.detected_language, "en");
        assert_eq!(analysis.created_at.to_rfc3339(), "2024-01-15T10:00:00.123456+00:00");

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body);
        assert!(body.contains("name=\"video_file\""));
        assert!(body.contains("Content-Type: video/mp4") || body.contains("content-type: video/mp4"));
    }

    #[tokio::test]
    async fn test_analyze_upload_replayed_after_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/video-analysis/analyze/"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "tok2" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/video-analysis/analyze/"))
            .and(header("Authorization", "Bearer tok2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(analysis_json(8)))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = video_api(&server)
            .analyze("clip.webm", b"fake video bytes".to_vec())
            .await
            .unwrap();
        assert_eq!(analysis.id, 8);

        let received = server.received_requests().await.unwrap();
        let replay = received.last().unwrap();
        assert!(String::from_utf8_lossy(&replay.body).contains("fake video bytes"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_file() {
        let server = MockServer::start().await;
        let err = video_api(&server).analyze("clip.mp4", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/video-analysis/history/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([analysis_json(2), analysis_json(1)])),
            )
            .mount(&server)
            .await;

        let history = video_api(&server).history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].summary, "A greeting");
    }
}
