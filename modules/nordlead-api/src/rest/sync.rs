use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use nordlead_common::JobType;

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct SyncRequest {
    #[serde(rename = "type")]
    job_type: JobType,
}

/// Start a run in the background. The job row is the progress surface;
/// concurrent requests simply produce concurrent jobs.
pub async fn api_trigger_sync(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(request): Json<SyncRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let orchestrator = state.orchestrator.clone();
    let job_type = request.job_type;
    info!(job_type = %job_type, "Sync triggered via API");

    tokio::spawn(async move {
        if let Err(err) = orchestrator.run(job_type).await {
            error!(job_type = %job_type, error = %err, "Triggered sync run failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "started": true, "type": job_type })),
    )
}

pub async fn api_sync_jobs(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let jobs = state.jobs.recent(20).await.map_err(internal_error)?;
    Ok(Json(json!({ "jobs": jobs })))
}
