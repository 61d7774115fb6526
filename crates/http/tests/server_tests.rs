//! Edge server routing: guard, health and the `/api/*` rewrite

#![cfg(feature = "server")]

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use portal_core::{
    PortalConfig, SessionSnapshot, TokenPair,
    snapshot::encode,
};
use portal_http::build_router;
use tower::ServiceExt;
use wiremock::matchers::{header as header_match, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn authenticated_cookie() -> String {
    let snapshot = SessionSnapshot {
        user: None,
        tokens: Some(TokenPair {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 600,
            token_type: "bearer".to_string(),
        }),
        is_authenticated: true,
    };
    let blob = encode(&snapshot).unwrap();
    format!("auth-storage={}", urlencoding::encode(&blob))
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health_is_public() {
    let router = build_router(&PortalConfig::default()).unwrap();

    let response = router.oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_protected_page_redirects_anonymous_to_login() {
    let router = build_router(&PortalConfig::default()).unwrap();

    let response = router.oneshot(get("/dashboard", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_malformed_cookie_counts_as_anonymous() {
    let router = build_router(&PortalConfig::default()).unwrap();

    let response = router
        .oneshot(get("/dashboard", Some("auth-storage=not-json")))
        .await
        .unwrap();
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_auth_page_redirects_authenticated_to_landing() {
    let router = build_router(&PortalConfig::default()).unwrap();
    let cookie = authenticated_cookie();

    let response = router
        .oneshot(get("/auth/login", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_protected_page_allowed_with_session() {
    let router = build_router(&PortalConfig::default()).unwrap();
    let cookie = authenticated_cookie();

    // No static dir configured, so an allowed navigation falls through to 404
    let response = router
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_prefix_bypasses_guard() {
    let router = build_router(&PortalConfig::default()).unwrap();

    let response = router
        .oneshot(get("/_next/static/chunk.js", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_serves_allowed_pages() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("favicon.ico"), b"icon").unwrap();

    let mut config = PortalConfig::default();
    config.server.static_dir = Some(dir.path().to_path_buf());
    let router = build_router(&config).unwrap();

    let response = router.oneshot(get("/favicon.ico", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"icon");
}

#[tokio::test]
async fn test_api_requests_are_forwarded_upstream() {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(query_param("expand", "profile"))
        .and(header_match("authorization", "Bearer a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .expect(1)
        .mount(&upstream)
        .await;

    let mut config = PortalConfig::default();
    config.proxy.upstream_origin = upstream.uri();
    let router = build_router(&config).unwrap();

    let request = Request::builder()
        .uri("/api/v1/users/me?expand=profile")
        .header(header::AUTHORIZATION, "Bearer a")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], 1);
}

#[tokio::test]
async fn test_forwarding_is_not_guarded_and_relays_status() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "no"})))
        .mount(&upstream)
        .await;

    let mut config = PortalConfig::default();
    config.proxy.upstream_origin = upstream.uri();
    let router = build_router(&config).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"a@b.co","password":"x"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let upstream = MockServer::start().await;

    let mut config = PortalConfig::default();
    config.proxy.upstream_origin = upstream.uri();
    config.server.max_body_bytes = 8;
    let router = build_router(&config).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/items")
        .body(Body::from("0123456789abcdef"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let mut config = PortalConfig::default();
    config.proxy.upstream_origin = "http://127.0.0.1:9".to_string();
    let router = build_router(&config).unwrap();

    let response = router.oneshot(get("/api/v1/items", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
