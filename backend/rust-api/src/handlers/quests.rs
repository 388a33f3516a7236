use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractors::AppJson;
use crate::models::{
    quest::{Quest, QuestListQuery, QuestStatus, QuestStatusRequest},
    Record,
};
use crate::services::{catalog_service::CatalogService, AppState};

/// GET /quests?status=
pub async fn list_quests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuestListQuery>,
) -> AppResult<Json<Vec<Record<Quest>>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<QuestStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let quests = CatalogService::new(state.store.clone())
        .list_quests(status)
        .await?;
    Ok(Json(quests))
}

/// PUT /quests/{id}/status
pub async fn set_quest_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<QuestStatusRequest>,
) -> AppResult<Json<Record<Quest>>> {
    let quest = CatalogService::new(state.store.clone())
        .set_quest_status(&id, req.status)
        .await?;
    Ok(Json(quest))
}
