use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::error::AppError;
use crate::models::user::Role;
use crate::services::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingToken,

    #[error("Token is not valid")]
    InvalidToken,

    #[error("Token is not valid")]
    ExpiredToken,

    /// The identity authority could not be reached or answered garbage.
    #[error("Token is not valid")]
    Authority(String),

    #[error("{0}")]
    Forbidden(String),
}

/// Verified caller, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only the user themself or an admin may act on `user_id`'s data.
    pub fn ensure_acts_for(&self, user_id: &str, denied: &str) -> Result<(), AuthError> {
        if self.subject == user_id || self.is_admin() {
            return Ok(());
        }
        tracing::warn!("Access denied: {} acting for {}", self.subject, user_id);
        Err(AuthError::Forbidden(denied.to_string()))
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Local HS256 identity authority.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue_token(
        &self,
        subject: &str,
        email: &str,
        role: Role,
    ) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Authority(format!("token signing failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

#[async_trait]
impl IdentityVerifier for JwtService {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.validate_token(token)?;
        Ok(Identity {
            subject: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VerifiedToken {
    uid: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: Role,
}

/// Delegates verification to an external identity authority over HTTP.
pub struct RemoteVerifier {
    client: reqwest::Client,
    url: String,
}

impl RemoteVerifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| AuthError::Authority(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidToken);
        }

        let verified: VerifiedToken = response
            .json()
            .await
            .map_err(|e| AuthError::Authority(format!("unexpected verifier reply: {}", e)))?;

        Ok(Identity {
            subject: verified.uid,
            email: verified.email,
            role: verified.role,
        })
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects requests without a verifiable bearer token and attaches the
/// caller's [`Identity`] to the rest.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;

    let identity = state.verifier.verify(token).await.map_err(|e| {
        match &e {
            AuthError::Authority(detail) => {
                tracing::error!("Identity authority failure: {}", detail)
            }
            other => tracing::warn!("Credential rejected: {:?}", other),
        }
        e
    })?;

    tracing::debug!("Authenticated user: {}", identity.subject);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Lets only admin callers through. Runs inside [`auth_middleware`].
pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<Identity>()
        .is_some_and(Identity::is_admin);

    if !is_admin {
        tracing::warn!("Access denied: admin role required");
        return Err(AuthError::Forbidden("Admin role required".to_string()).into());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_tokens_verify_to_the_same_identity() {
        let service = JwtService::new("test-secret", 3600);

        let token = service.issue_token("user123", "a@b.io", Role::Student).unwrap();
        let identity = service.verify(&token).await.unwrap();

        assert_eq!(identity.subject, "user123");
        assert_eq!(identity.email, "a@b.io");
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn admin_role_survives_the_token() {
        let service = JwtService::new("test-secret", 3600);

        let token = service.issue_token("root", "r@b.io", Role::Admin).unwrap();
        let identity = service.verify(&token).await.unwrap();

        assert!(identity.is_admin());
        assert!(identity.ensure_acts_for("someone-else", "denied").is_ok());
    }

    #[test]
    fn students_act_only_for_themselves() {
        let identity = Identity {
            subject: "u1".into(),
            email: "u1@b.io".into(),
            role: Role::Student,
        };

        assert!(identity.ensure_acts_for("u1", "denied").is_ok());
        let err = identity.ensure_acts_for("u2", "denied").unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(ref m) if m == "denied"));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = JwtService::new("secret-a", 3600);
        let verifier = JwtService::new("secret-b", 3600);

        let token = issuer.issue_token("user123", "a@b.io", Role::Student).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = JwtService::new("test-secret", -7200);

        let token = service.issue_token("user123", "a@b.io", Role::Student).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn garbage_is_not_a_token() {
        let service = JwtService::new("test-secret", 3600);
        assert!(matches!(
            service.validate_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }
}
