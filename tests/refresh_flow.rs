//! End-to-end behavior of refresh-on-401 against a mock API server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use newsfeed_client::auth::TokenStore;
use newsfeed_client::{AuthClient, ClientConfig, ClientError, OutgoingCall, RefreshError, RefreshPhase};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Builds a client against `server` and records session-ended redirects
async fn client_with_redirects(server: &MockServer) -> (AuthClient, Arc<Mutex<Vec<String>>>) {
    let client = AuthClient::new(ClientConfig::with_base_url(server.uri()), TokenStore::in_memory())
        .expect("client");
    let redirects = Arc::new(Mutex::new(Vec::new()));
    let sink = redirects.clone();
    client
        .on_session_ended(move |location| sink.lock().unwrap().push(location.to_string()))
        .await;
    (client, redirects)
}

async fn mount_expired_and_fresh(server: &MockServer, route: &str, fresh_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("Authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("Authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(fresh_calls)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({ "refresh": "ref1" })))
        .respond_with(response)
        .expect(calls)
        .named("refresh")
        .mount(server)
        .await;
}

fn refresh_ok_after(delay_ms: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "access": "tok2" }))
        .set_delay(Duration::from_millis(delay_ms))
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 2).await;
    mount_refresh(&server, refresh_ok_after(100), 1).await;

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    let (c1, c2) = tokio::join!(
        client.execute(OutgoingCall::get("/api/chat/sessions/")),
        client.execute(OutgoingCall::get("/api/chat/sessions/")),
    );

    assert_eq!(c1.unwrap().status(), 200);
    assert_eq!(c2.unwrap().status(), 200);
    assert_eq!(client.coordinator().refresh_count(), 1);
    assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
    assert_eq!(client.coordinator().queued(), 0);
    assert!(redirects.lock().unwrap().is_empty());
    assert_eq!(client.tokens().get_access().as_deref(), Some("tok2"));
}

#[tokio::test]
async fn test_many_concurrent_401s_issue_exactly_one_refresh() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/status/", 5).await;
    mount_refresh(&server, refresh_ok_after(150), 1).await;

    let (client, _) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    let calls = (0..5).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.execute(OutgoingCall::get("/api/chat/status/")).await })
    });
    let handles: Vec<_> = calls.collect();

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status(), 200);
    }
    assert_eq!(client.coordinator().refresh_count(), 1);
}

#[tokio::test]
async fn test_retried_call_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, refresh_ok_after(0), 1).await;

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    let err = client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(redirects.lock().unwrap().is_empty());
    assert_eq!(client.tokens().get_access().as_deref(), Some("tok2"));
    assert_eq!(client.tokens().get_refresh().as_deref(), Some("ref1"));
}

#[tokio::test]
async fn test_exempt_endpoints_never_refresh() {
    let server = MockServer::start().await;
    for route in ["/auth/signin", "/auth/register/", REFRESH_PATH] {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
    }

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    for route in ["/auth/signin", "/auth/register/", REFRESH_PATH] {
        let err = client.execute(OutgoingCall::post(route)).await.unwrap_err();
        assert!(err.is_unauthorized(), "{route} should propagate 401");
    }

    assert_eq!(client.coordinator().refresh_count(), 0);
    assert!(redirects.lock().unwrap().is_empty());
    assert_eq!(client.tokens().get_access().as_deref(), Some("tok1"));
    // Only the three exempt calls reached the server
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_refresh_clears_both_credentials() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 0).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_delay(Duration::from_millis(100)),
        1,
    )
    .await;

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    let (c1, c2) = tokio::join!(
        client.execute(OutgoingCall::get("/api/chat/sessions/")),
        client.execute(OutgoingCall::get("/api/chat/sessions/")),
    );

    for result in [c1, c2] {
        match result.unwrap_err() {
            ClientError::SessionEnded(RefreshError::Rejected { status }) => assert_eq!(status, 401),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert!(client.tokens().get_access().is_none());
    assert!(client.tokens().get_refresh().is_none());
    assert!(!client.is_signed_in());
    assert_eq!(*redirects.lock().unwrap(), vec!["/signin".to_string()]);
    assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn test_server_error_on_refresh_ends_session() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/status/", 0).await;
    mount_refresh(&server, ResponseTemplate::new(500), 1).await;

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    let err = client
        .execute(OutgoingCall::get("/api/chat/status/"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::SessionEnded(RefreshError::Rejected { status: 500 })
    ));
    assert!(client.tokens().get_access().is_none());
    assert_eq!(redirects.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_refresh_credential_ends_session_without_refresh_call() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 0).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, redirects) = client_with_redirects(&server).await;
    client.tokens().set_access(Some("tok1"));

    let err = client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::SessionEnded(RefreshError::MissingRefreshToken)
    ));
    assert!(client.tokens().get_access().is_none());
    assert!(client.tokens().get_refresh().is_none());
    assert_eq!(*redirects.lock().unwrap(), vec!["/signin".to_string()]);
    assert_eq!(client.coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_next_call_uses_refreshed_credential() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 1).await;
    mount_refresh(&server, refresh_ok_after(0), 1).await;
    Mock::given(method("GET"))
        .and(path("/api/chat/status/"))
        .and(header("Authorization", "Bearer tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "system": "online" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap();
    let status: serde_json::Value = client.get_json("/api/chat/status/").await.unwrap();

    assert_eq!(status["system"], "online");
}

#[tokio::test]
async fn test_rotated_refresh_credential_is_stored() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "access": "tok2", "refresh": "ref2" })),
        1,
    )
    .await;

    let (client, _) = client_with_redirects(&server).await;
    client.tokens().set_pair("tok1", "ref1");

    client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap();

    assert_eq!(client.tokens().get_refresh().as_deref(), Some("ref2"));
}

#[tokio::test]
async fn test_refresh_recovers_after_session_restart() {
    let server = MockServer::start().await;
    mount_expired_and_fresh(&server, "/api/chat/sessions/", 1).await;
    mount_refresh(&server, refresh_ok_after(0), 1).await;

    let (client, _) = client_with_redirects(&server).await;
    client.tokens().set_access(Some("tok1"));

    // No refresh credential: session ends
    let err = client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap_err();
    assert!(err.is_session_ended());

    // The coordinator is back to Idle and refreshes normally once signed in again
    client.tokens().set_pair("tok1", "ref1");
    let response = client
        .execute(OutgoingCall::get("/api/chat/sessions/"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
