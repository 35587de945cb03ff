use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use nordlead_store::Integration;
use webhook_client::EventPayload;

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateIntegration {
    #[serde(rename = "type")]
    integration_type: String,
    name: String,
    config: serde_json::Value,
    #[serde(default)]
    events: Vec<String>,
}

#[derive(Deserialize)]
pub struct TriggerRequest {
    event: String,
    data: serde_json::Value,
}

const INTEGRATION_TYPES: [&str; 4] = ["slack", "teams", "webhook", "zapier"];

fn integration_json(integration: &Integration) -> serde_json::Value {
    json!({
        "id": integration.id,
        "type": integration.integration_type,
        "name": integration.name,
        "config": integration.config,
        "events": integration.events,
        "isActive": integration.is_active,
        "createdAt": integration.created_at,
    })
}

pub async fn api_integrations_list(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let integrations = state
        .admin
        .list_integrations()
        .await
        .map_err(internal_error)?;
    let body: Vec<_> = integrations.iter().map(integration_json).collect();
    Ok(Json(json!({ "integrations": body })))
}

pub async fn api_integration_create(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(request): Json<CreateIntegration>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    if !INTEGRATION_TYPES.contains(&request.integration_type.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let integration = state
        .admin
        .create_integration(
            &request.integration_type,
            &request.name,
            &request.config,
            &request.events,
        )
        .await
        .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(integration_json(&integration))))
}

pub async fn api_integration_delete(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    state
        .admin
        .delete_integration(id)
        .await
        .map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fan an event out to every subscribed integration. Per-target failures
/// are logged and counted, never fatal to the fan-out.
pub async fn api_integrations_trigger(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let integrations = state
        .admin
        .integrations_for_event(&request.event)
        .await
        .map_err(internal_error)?;

    let mut delivered = 0usize;
    let mut failed = 0usize;

    for integration in &integrations {
        let outcome = deliver(state.as_ref(), integration, &request).await;
        let (success, detail) = match outcome {
            Ok(()) => {
                delivered += 1;
                (true, None)
            }
            Err(err) => {
                warn!(
                    integration = integration.name.as_str(),
                    error = %err,
                    "Integration delivery failed"
                );
                failed += 1;
                (false, Some(err))
            }
        };
        if let Err(err) = state
            .admin
            .log_delivery(integration.id, &request.event, success, detail.as_deref())
            .await
        {
            warn!(error = %err, "Failed to log integration delivery");
        }
    }

    Ok(Json(json!({
        "event": request.event,
        "targets": integrations.len(),
        "delivered": delivered,
        "failed": failed,
    })))
}

async fn deliver(
    state: &AppState,
    integration: &Integration,
    request: &TriggerRequest,
) -> Result<(), String> {
    let webhook_url = integration.config["webhookUrl"]
        .as_str()
        .ok_or_else(|| "integration config has no webhookUrl".to_string())?;

    let result = match integration.integration_type.as_str() {
        "slack" => {
            let text = format!(
                "*{}*\n```{}```",
                request.event,
                serde_json::to_string_pretty(&request.data).unwrap_or_default()
            );
            state.webhooks.send_slack(webhook_url, &text).await
        }
        "teams" => {
            let text = serde_json::to_string_pretty(&request.data).unwrap_or_default();
            state
                .webhooks
                .send_teams(webhook_url, &request.event, &text)
                .await
        }
        // Generic webhooks and Zapier share the raw payload shape.
        _ => {
            let payload = EventPayload {
                event: request.event.clone(),
                data: request.data.clone(),
                timestamp: Utc::now().to_rfc3339(),
            };
            let token = integration.config["token"].as_str();
            state
                .webhooks
                .send_generic(webhook_url, token, &payload)
                .await
        }
    };

    result.map_err(|err| err.to_string())
}
