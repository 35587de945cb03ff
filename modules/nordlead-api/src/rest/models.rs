use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use nordlead_common::RelatedCounts;
use nordlead_store::ScoringModelRecord;
use nordlead_sync::model::ScoringModel;

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateModel {
    name: String,
    description: Option<String>,
    config: serde_json::Value,
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    orgnr: String,
}

fn model_json(record: &ScoringModelRecord) -> serde_json::Value {
    json!({
        "id": record.id,
        "name": record.name,
        "description": record.description,
        "isActive": record.is_active,
        "isDefault": record.is_default,
        "config": record.config,
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    })
}

pub async fn api_models_list(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let models = state.admin.list_models().await.map_err(internal_error)?;
    let body: Vec<_> = models.iter().map(model_json).collect();
    Ok(Json(json!({ "models": body })))
}

pub async fn api_model_active(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let record = state
        .admin
        .active_model()
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(model_json(&record)))
}

pub async fn api_model_create(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(request): Json<CreateModel>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    // The config must parse into the closed expression form before it is
    // persisted; there is no later point where a bad model can fail safely.
    if ScoringModel::from_json(&request.config).is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let record = state
        .admin
        .create_model(&request.name, request.description.as_deref(), &request.config)
        .await
        .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(model_json(&record))))
}

pub async fn api_model_activate(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    if state
        .admin
        .get_model(id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }
    state.admin.activate_model(id).await.map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_model_delete(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    state.admin.delete_model(id).await.map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a stored model to one company without persisting anything.
pub async fn api_model_preview(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let record = state
        .admin
        .get_model(id)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let model = ScoringModel::from_json(&record.config)
        .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;

    let snapshot = state
        .entities
        .get_by_orgnr(&request.orgnr)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let sub_entities = state
        .entities
        .sub_entity_count(&request.orgnr)
        .await
        .map_err(internal_error)?;

    let result = model.apply(&snapshot, &RelatedCounts { sub_entities });
    Ok(Json(json!({
        "orgnr": request.orgnr,
        "model": record.name,
        "score": result.score,
        "signals": result.signals,
    })))
}
