use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extractors::AppJson;
use crate::models::user::{LoginRequest, LoginResponse};
use crate::services::{user_service::UserService, AppState};

/// POST /auth/login - Check credentials; a token is issued only when this
/// service is its own identity authority.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let service = UserService::new(state.store.clone(), state.config.bcrypt_cost);
    let user = service.login(req).await?;

    let access_token = match &state.issuer {
        Some(issuer) => Some(issuer.issue_token(&user.id, &user.email, user.role)?),
        None => None,
    };

    Ok(Json(LoginResponse {
        success: true,
        user,
        access_token,
    }))
}
