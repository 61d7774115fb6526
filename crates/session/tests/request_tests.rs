//! Refresh-and-retry behaviour of the authenticated request wrapper

mod common;

use common::{authenticated_blob, store, token_body, tokens};
use portal_session::{AuthenticatedRequester, RequestOptions, SessionError, SessionState};
use reqwest::{Method, StatusCode, header};
use serde_json::json;
use wiremock::matchers::{body_json, header as header_match, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_attaches_bearer_and_json_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/items"))
        .and(header_match("authorization", "Bearer a1"))
        .and(header_match("content-type", "application/json"))
        .and(body_json(json!({"name": "widget"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store).unwrap();

    let options = RequestOptions::new(Method::POST)
        .json(&json!({"name": "widget"}))
        .unwrap();
    let response = requester.request("/api/v1/items", options).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_request_has_no_token_and_ignores_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/public"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", 600)))
        .expect(0)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store).unwrap();

    let response = requester
        .request("/api/v1/public", RequestOptions::default().public())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_caller_headers_override_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/upload"))
        .and(header_match("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store).unwrap();

    let options = RequestOptions::new(Method::PUT)
        .header(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"))
        .body("hello");
    requester.request("/api/v1/upload", options).await.unwrap();
}

#[tokio::test]
async fn test_401_refreshes_once_and_retries_with_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header_match("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header_match("authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", 600)))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store.clone()).unwrap();

    let body: serde_json::Value = requester
        .request_json("/api/v1/users/me", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(body["id"], 42);
    assert_eq!(store.access_token().as_deref(), Some("a2"));
}

#[tokio::test]
async fn test_second_401_fails_without_looping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", 600)))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store.clone()).unwrap();

    let err = requester
        .request("/api/v1/users/me", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::AuthenticationFailed));
    // The refresh itself succeeded, so the session stays
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_refresh_failure_logs_out_and_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store.clone()).unwrap();

    let err = requester
        .request("/api/v1/users/me", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::AuthenticationFailed));
    assert_eq!(store.state(), SessionState::default());
}

#[tokio::test]
async fn test_non_401_errors_pass_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/items"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", 600)))
        .expect(0)
        .mount(&server)
        .await;

    let (store, _) = store(&server, Some(authenticated_blob(tokens("a1", 600))));
    let requester = AuthenticatedRequester::new(server.uri(), store).unwrap();

    let response = requester
        .request("/api/v1/items", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
