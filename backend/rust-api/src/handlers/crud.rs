//! CRUD handlers shared by the reference-data collections.
//!
//! Mounted per entity, e.g. `get(crud::list::<Badge>)`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppResult;
use crate::extractors::AppJson;
use crate::models::Record;
use crate::repository::{Entity, Repository};
use crate::services::AppState;

pub async fn list<E: Entity>(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Record<E>>>> {
    let records = Repository::<E>::new(state.store.clone()).find_all().await?;
    Ok(Json(records))
}

pub async fn get<E: Entity>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Record<E>>> {
    let record = Repository::<E>::new(state.store.clone()).get(&id).await?;
    Ok(Json(record))
}

pub async fn create<E: Entity>(
    State(state): State<Arc<AppState>>,
    AppJson(data): AppJson<E>,
) -> AppResult<impl IntoResponse> {
    let record = Repository::<E>::new(state.store.clone())
        .create(data)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<E: Entity>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(data): AppJson<E>,
) -> AppResult<Json<Record<E>>> {
    let record = Repository::<E>::new(state.store.clone())
        .update(&id, data)
        .await?;
    Ok(Json(record))
}

pub async fn delete<E: Entity>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Repository::<E>::new(state.store.clone()).delete(&id).await?;
    Ok(Json(json!({ "success": true })))
}
