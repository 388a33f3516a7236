use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppResult;
use crate::extractors::AppJson;
use crate::middlewares::auth::Identity;
use crate::models::user::{
    CreateUserRequest, LeaderboardEntry, UpdateProfileRequest, UserFilterQuery, UserListResponse,
    UserProfile, UserProgress, UserResponse,
};
use crate::services::{user_service::UserService, AppState};

fn service(state: &AppState) -> UserService {
    UserService::new(state.store.clone(), state.config.bcrypt_cost)
}

/// POST /user - Sign-up (public)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user = service(&state).create_user(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user,
        }),
    ))
}

/// GET /user/profile/{id}
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(service(&state).get_profile(&id).await?))
}

/// PUT /user/profile/{id}
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    identity.ensure_acts_for(&id, "Cannot modify another user's profile")?;
    let user = service(&state).update_profile(&id, req).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// GET /user/progress/{id}
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProgress>> {
    Ok(Json(service(&state).progress(&id).await?))
}

/// GET /users/profile - The caller's own profile
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(service(&state).get_profile(&identity.subject).await?))
}

/// GET /user/badges
pub async fn my_badges(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> AppResult<impl IntoResponse> {
    let badges = service(&state).badges(&identity.subject).await?;
    Ok(Json(json!({ "badges": badges })))
}

/// GET /user/quiz-scores
pub async fn my_quiz_scores(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> AppResult<impl IntoResponse> {
    let quiz_scores = service(&state).quiz_scores(&identity.subject).await?;
    Ok(Json(json!({ "quiz_scores": quiz_scores })))
}

/// GET /users/all?sport=&age_group=
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UserFilterQuery>,
) -> AppResult<Json<UserListResponse>> {
    let users = service(&state).list(&filter).await?;
    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}

/// GET /user/leaderboard?sport=&age_group= (public)
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UserFilterQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(service(&state).leaderboard(&filter).await?))
}
