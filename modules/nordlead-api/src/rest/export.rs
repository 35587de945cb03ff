use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use nordlead_common::EntityStatus;
use nordlead_store::{CompanyFilter, ExportRow};

use crate::auth::AdminSession;
use crate::rest::internal_error;
use crate::AppState;

/// Hard cap on exported rows.
const EXPORT_CAP: i64 = 10_000;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFilters {
    status: Option<String>,
    min_score: Option<i32>,
    max_score: Option<i32>,
    county: Option<String>,
    municipality: Option<String>,
    industry_prefix: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    filters: ExportFilters,
    format: Option<String>,
}

pub async fn api_export(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(request): Json<ExportRequest>,
) -> Result<Response, StatusCode> {
    let status = match request.filters.status.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<EntityStatus>()
                .map_err(|_| StatusCode::BAD_REQUEST)?,
        ),
    };
    let filter = CompanyFilter {
        status,
        min_score: request.filters.min_score,
        max_score: request.filters.max_score,
        county: request.filters.county,
        municipality: request.filters.municipality,
        industry_prefix: request.filters.industry_prefix,
        search: None,
    };

    let rows = state
        .catalog
        .export_rows(&filter, EXPORT_CAP)
        .await
        .map_err(internal_error)?;

    if let Err(err) = state
        .admin
        .record_audit("export_csv", Some("company"), json!({ "count": rows.len() }))
        .await
    {
        warn!(error = %err, "Failed to record export audit entry");
    }

    if request.format.as_deref() == Some("json") {
        let body: Vec<_> = rows
            .iter()
            .map(|row| {
                json!({
                    "company": row.company,
                    "topReasons": row.top_reasons,
                })
            })
            .collect();
        return Ok(Json(body).into_response());
    }

    let csv = generate_csv(&rows);
    let filename = format!("companies-export-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

fn generate_csv(rows: &[ExportRow]) -> String {
    let mut out = String::from(
        "Name,Org Number,Status,Industry,Employees,Municipality,County,Phone,Website,Email,Lead Score,Use Case Fit,Urgency Score,Data Quality,Top Reasons\n",
    );

    for row in rows {
        let company = &row.company;
        let fields = [
            escape_csv(&company.name),
            company.orgnr.clone(),
            company.status.to_string(),
            escape_csv(company.industry_description.as_deref().unwrap_or("")),
            company
                .employee_count
                .map(|n| n.to_string())
                .unwrap_or_default(),
            escape_csv(company.municipality.as_deref().unwrap_or("")),
            escape_csv(company.county.as_deref().unwrap_or("")),
            escape_csv(company.phone.as_deref().unwrap_or("")),
            escape_csv(company.website.as_deref().unwrap_or("")),
            escape_csv(company.email.as_deref().unwrap_or("")),
            company.overall_score.to_string(),
            company.use_case_fit.to_string(),
            company.urgency_score.to_string(),
            company.data_quality_score.to_string(),
            escape_csv(&row.top_reasons.join("; ")),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use nordlead_common::EntitySnapshot;

    use super::*;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(escape_csv("Fjord Logistikk AS"), "Fjord Logistikk AS");
    }

    #[test]
    fn separators_and_quotes_are_escaped() {
        assert_eq!(escape_csv("Bygg, Anlegg"), "\"Bygg, Anlegg\"");
        assert_eq!(escape_csv("He said \"hi\""), "\"He said \"\"hi\"\"\"");
        assert_eq!(escape_csv("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let company = EntitySnapshot {
            id: Uuid::nil(),
            orgnr: "918654321".into(),
            name: "Fjord, Logistikk AS".into(),
            status: nordlead_common::EntityStatus::Active,
            organization_form_code: None,
            organization_form_name: None,
            founded_date: None,
            municipality: Some("Oslo".into()),
            municipality_number: None,
            county: Some("Oslo".into()),
            postal_code: None,
            address: None,
            industry_code: None,
            industry_description: Some("Warehousing".into()),
            employee_count: Some(45),
            phone: None,
            website: None,
            email: None,
            logo_url: None,
            role_data_loaded: false,
            ai_summary: None,
            overall_score: 82,
            use_case_fit: 85,
            urgency_score: 80,
            data_quality_score: 90,
            last_seen_at: ts,
            source_updated_at: None,
            created_at: ts,
            updated_at: ts,
        };
        let rows = vec![ExportRow {
            company,
            top_reasons: vec!["Actively operating".into(), "45 employees - ideal SMB size".into()],
        }];

        let csv = generate_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Name,Org Number,Status"));
        assert!(lines[1].starts_with("\"Fjord, Logistikk AS\",918654321,active"));
        assert!(lines[1].contains("Actively operating; 45 employees - ideal SMB size"));
    }
}
