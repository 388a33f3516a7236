use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};

mod common;

/// Stand-in identity authority: knows two tokens, rejects everything else.
async fn verify(Json(body): Json<Value>) -> impl IntoResponse {
    match body["token"].as_str() {
        Some("good-token") => (
            StatusCode::OK,
            json!({ "uid": "remote-1", "email": "remote-1@example.com" }).to_string(),
        ),
        Some("ops-token") => (
            StatusCode::OK,
            json!({ "uid": "ops", "email": "ops@example.com", "role": "admin" }).to_string(),
        ),
        Some("garbled-token") => (StatusCode::OK, "<html>maintenance</html>".to_string()),
        _ => (StatusCode::UNAUTHORIZED, json!({ "error": "revoked" }).to_string()),
    }
}

async fn spawn_authority() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/verify", post(verify));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/verify", addr)
}

fn remote_app(verify_url: String) -> common::TestApp {
    let mut config = common::test_config();
    config.identity_verify_url = Some(verify_url);
    common::create_test_app_with(config)
}

#[tokio::test]
async fn test_accepted_token_attaches_the_remote_identity() {
    let app = remote_app(spawn_authority().await);
    app.seed_user("remote-1", 40, &[]).await;

    let (status, body) = app
        .send("GET", "/users/profile", Some("good-token"), None)
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["id"], json!("remote-1"));
    assert_eq!(body["points"], json!(40));
}

#[tokio::test]
async fn test_rejected_token_is_not_valid() {
    let app = remote_app(spawn_authority().await);

    for token in ["revoked-token", "garbled-token"] {
        let (status, body) = app.send("GET", "/users/profile", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", token);
        assert_eq!(body["error"], json!("Token is not valid"));
    }
}

#[tokio::test]
async fn test_unreachable_authority_denies_access() {
    let app = remote_app("http://127.0.0.1:1/verify".to_string());

    let (status, body) = app
        .send("GET", "/users/profile", Some("good-token"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Token is not valid"));
}

#[tokio::test]
async fn test_role_comes_from_the_authority() {
    let app = remote_app(spawn_authority().await);
    let badge = json!({
        "badge_id": "badge_010",
        "title": "Verified",
        "description": "Checked by the authority",
        "icon_url": "https://cdn.example.com/v.svg",
        "unlock_criteria": "None",
    });

    let (status, _) = app
        .send("POST", "/badges", Some("good-token"), Some(badge.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send("POST", "/badges", Some("ops-token"), Some(badge))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn test_login_issues_no_token_under_a_remote_authority() {
    let app = remote_app(spawn_authority().await);
    app.seed_user("remote-1", 0, &[]).await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "remote-1@example.com", "password": common::TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.get("access_token").is_none());
}
