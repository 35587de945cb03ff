use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

pub async fn api_dashboard_stats(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let stats = state
        .catalog
        .dashboard_stats()
        .await
        .map_err(internal_error)?;

    let by_county: Vec<_> = stats
        .by_county
        .iter()
        .map(|(county, count)| json!({ "county": county, "count": count }))
        .collect();
    let score_distribution: Vec<_> = stats
        .score_distribution
        .iter()
        .map(|(bucket, count)| json!({ "bucket": bucket, "count": count }))
        .collect();

    Ok(Json(json!({
        "totalCompanies": stats.total_companies,
        "activeCompanies": stats.active_companies,
        "highScoreLeads": stats.high_score_leads,
        "averageScore": stats.average_score,
        "byCounty": by_county,
        "scoreDistribution": score_distribution,
    })))
}
