#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use gadi_api::{
    config::Config,
    create_router,
    middlewares::auth::JwtService,
    models::{
        module::{ContentType, Module},
        quiz::{Question, Quiz},
        user::{AgeGroup, Role, SportCategory, User},
        Stamped,
    },
    services::AppState,
    store::{encode, DocumentStore, MemoryStore},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "secret-password";
pub const METRICS_AUTH: &str = "metrics:letmein";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    jwt: JwtService,
}

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://unused".to_string(),
        mongo_database: "gadi_test".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl_secs: 3600,
        identity_verify_url: None,
        bcrypt_cost: 4,
        metrics_auth: METRICS_AUTH.to_string(),
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone()));

    TestApp {
        router: create_router(state),
        store,
        jwt: JwtService::new(TEST_SECRET, 3600),
    }
}

impl TestApp {
    pub fn token_for(&self, user_id: &str) -> String {
        self.jwt
            .issue_token(user_id, &format!("{}@example.com", user_id), Role::Student)
            .unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.jwt
            .issue_token("admin", "admin@example.com", Role::Admin)
            .unwrap()
    }

    pub async fn seed_user(&self, id: &str, points: i64, completed_modules: &[&str]) {
        let user = User {
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            password_hash: bcrypt::hash(TEST_PASSWORD, 4).unwrap(),
            points,
            level: points / 100 + 1,
            rank: 0,
            sport: SportCategory::Athletics,
            age_group: AgeGroup::Adult,
            completed_modules: completed_modules.iter().map(|m| m.to_string()).collect(),
            quiz_scores: Vec::new(),
            badges: BTreeSet::new(),
            role: Role::Student,
        };
        self.store
            .put("users", id, encode(&Stamped::new(user)).unwrap())
            .await
            .unwrap();
    }

    /// Seeds a quiz whose questions `q1..qN` all have "A" as the right answer.
    pub async fn seed_quiz(&self, id: &str, module_id: &str, questions: usize, passing_score: f64) {
        let questions = (1..=questions)
            .map(|n| Question {
                question_id: format!("q{}", n),
                question_text: format!("Question {}", n),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option: "A".to_string(),
                explanation: String::new(),
            })
            .collect();
        let quiz = Quiz {
            quiz_id: Some(format!("logical-{}", id)),
            module_id: module_id.to_string(),
            title: Some(format!("Quiz {}", id)),
            passing_score,
            attempt_limit: 3,
            questions,
        };
        self.store
            .put("quizzes", id, encode(&Stamped::new(quiz)).unwrap())
            .await
            .unwrap();
    }

    pub async fn seed_module(&self, id: &str, module_id: &str, level_required: i64) {
        let module = Module {
            module_id: Some(module_id.to_string()),
            title: format!("Module {}", module_id),
            description: "Anti-doping basics".to_string(),
            content_type: ContentType::Video,
            content_url: "https://cdn.example.com/video.mp4".to_string(),
            estimated_time: 10,
            level_required,
            quiz_id: None,
        };
        self.store
            .put("modules", id, encode(&Stamped::new(module)).unwrap())
            .await
            .unwrap();
    }

    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Sends a request and parses the response body as JSON (`Null` when empty).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, text) = self.send_raw(method, uri, token, body).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    pub async fn user_doc(&self, id: &str) -> Value {
        let token = self.token_for(id);
        let (status, body) = self
            .send("GET", &format!("/user/profile/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "profile lookup failed: {}", body);
        body
    }
}
