use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    module::{Module, ModuleListQuery, ModuleProgress},
    Record,
};
use crate::services::{catalog_service::CatalogService, user_service::UserService, AppState};

/// GET /modules?level=
pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModuleListQuery>,
) -> AppResult<Json<Vec<Record<Module>>>> {
    let modules = CatalogService::new(state.store.clone())
        .list_modules(query.level)
        .await?;
    Ok(Json(modules))
}

/// GET /modules/progress/{user_id}
pub async fn module_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ModuleProgress>> {
    let progress = UserService::new(state.store.clone(), state.config.bcrypt_cost)
        .progress(&user_id)
        .await?;
    Ok(Json(ModuleProgress {
        completed_modules: progress.completed_modules,
        quiz_scores: progress.quiz_scores,
    }))
}
