use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;

use nordlead_common::EntityStatus;
use nordlead_store::CompanyFilter;

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Deserialize)]
pub struct CompaniesQuery {
    status: Option<String>,
    min_score: Option<i32>,
    max_score: Option<i32>,
    county: Option<String>,
    municipality: Option<String>,
    industry: Option<String>,
    q: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn api_companies(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Query(query): Query<CompaniesQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<EntityStatus>()
                .map_err(|_| StatusCode::BAD_REQUEST)?,
        ),
    };

    let filter = CompanyFilter {
        status,
        min_score: query.min_score,
        max_score: query.max_score,
        county: query.county,
        municipality: query.municipality,
        industry_prefix: query.industry,
        search: query.q,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let page = state
        .catalog
        .list_companies(&filter, limit, offset)
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({
        "companies": page.companies,
        "total": page.total,
        "limit": limit,
        "offset": offset,
    })))
}

pub async fn api_company_detail(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(orgnr): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let detail = state
        .catalog
        .company_detail(&orgnr)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!({
        "company": detail.company,
        "explanations": detail.explanations,
        "roles": detail.roles,
        "subEntities": detail.sub_entities,
    })))
}

pub async fn api_regenerate_summary(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(orgnr): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(summarizer) = &state.summarizer else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let snapshot = state
        .entities
        .get_by_orgnr(&orgnr)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let text = summarizer.summarize(&snapshot).await;
    state
        .entities
        .set_summary(&orgnr, &text)
        .await
        .map_err(internal_error)?;

    Ok(Json(json!({ "orgnr": orgnr, "summary": text })))
}
