use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractors::AppJson;
use crate::middlewares::auth::Identity;
use crate::models::quiz::{PublicQuiz, SubmitQuizRequest, SubmitQuizResponse};
use crate::services::{quiz_service::QuizService, AppState};

fn service(state: &AppState) -> QuizService {
    QuizService::new(state.store.clone(), state.badge_rules.clone())
}

/// GET /quizzes
pub async fn list_quizzes(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<PublicQuiz>>> {
    Ok(Json(service(&state).list_public().await?))
}

/// GET /quizzes/{id}
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicQuiz>> {
    Ok(Json(service(&state).get_public(&id).await?))
}

/// GET /quizzes/module/{module_id}
pub async fn get_quiz_for_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> AppResult<Json<PublicQuiz>> {
    Ok(Json(service(&state).get_public_for_module(&module_id).await?))
}

/// GET /quizzes/by-quizid/{quiz_id}
pub async fn get_quiz_by_quiz_id(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
) -> AppResult<Json<PublicQuiz>> {
    Ok(Json(service(&state).get_public_by_quiz_id(&quiz_id).await?))
}

/// POST /quizzes/submit/{quiz_id} - Score an attempt and apply rewards
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(quiz_id): Path<String>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> AppResult<Json<SubmitQuizResponse>> {
    if let Some(user_id) = req.user_id.as_deref() {
        if user_id != identity.subject {
            tracing::warn!(
                "User {} tried to submit quiz {} as {}",
                identity.subject,
                quiz_id,
                user_id
            );
            return Err(AppError::Validation(
                "Cannot submit a quiz on behalf of another user".to_string(),
            ));
        }
    }

    let response = service(&state)
        .submit_quiz(&identity.subject, &quiz_id, &req.answers)
        .await?;
    Ok(Json(response))
}
