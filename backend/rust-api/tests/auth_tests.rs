use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use gadi_api::middlewares::auth::JwtService;
use gadi_api::models::user::Role;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_missing_token_is_denied() {
    let app = common::create_test_app();

    for uri in ["/users/all", "/badges", "/quests", "/modules", "/user/badges"] {
        let (status, body) = app.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], json!("No token, authorization denied"));
    }
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let app = common::create_test_app();
    let foreign = JwtService::new("some-other-secret", 3600)
        .issue_token("u1", "u1@example.com", Role::Student)
        .unwrap();
    let expired = JwtService::new(common::TEST_SECRET, -7200)
        .issue_token("u1", "u1@example.com", Role::Student)
        .unwrap();

    for token in ["garbage", foreign.as_str(), expired.as_str()] {
        let (status, body) = app.send("GET", "/users/all", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("Token is not valid"));
    }
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = common::create_test_app();

    let (status, body) = app.send("GET", "/user/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let app = common::create_test_app();

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("gadi-api"));

    app.store.set_unavailable(true);
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("degraded"));
    assert_eq!(body["dependencies"]["store"]["status"], json!("unhealthy"));
}

#[tokio::test]
async fn test_metrics_require_basic_auth() {
    let app = common::create_test_app();

    let (status, _) = app.send_raw("GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Generate at least one HTTP sample before scraping
    app.send("GET", "/health", None, None).await;

    let credentials = general_purpose::STANDARD.encode(common::METRICS_AUTH);
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .header(header::AUTHORIZATION, format!("Basic {}", credentials))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
