use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extractors::AppJson;
use crate::middlewares::auth::Identity;
use crate::models::{progress_log::ProgressLog, Record};
use crate::repository::Repository;
use crate::services::AppState;
use crate::store::Query;

/// GET /user-progress/user/{user_id} - Activity log, newest first
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Record<ProgressLog>>>> {
    let logs = Repository::<ProgressLog>::new(state.store.clone())
        .find_where(Query::new().eq("user_id", user_id))
        .await?;
    Ok(Json(logs))
}

/// POST /user-progress - Log an activity for the caller
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    AppJson(log): AppJson<ProgressLog>,
) -> AppResult<impl IntoResponse> {
    identity.ensure_acts_for(&log.user_id, "Cannot log activity for another user")?;

    let record = Repository::<ProgressLog>::new(state.store.clone())
        .create(log)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
