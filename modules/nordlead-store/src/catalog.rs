use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use nordlead_common::{
    EntityRole, EntitySnapshot, EntityStatus, ScoreSignal, SubEntity, HIGH_SCORE_THRESHOLD,
};

use crate::entity_store::CompanyRow;
use crate::error::Result;

/// Filters shared by the listing, the count and the CSV export.
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub status: Option<EntityStatus>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub county: Option<String>,
    pub municipality: Option<String>,
    pub industry_prefix: Option<String>,
    pub search: Option<String>,
}

impl CompanyFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(min) = self.min_score {
            qb.push(" AND overall_score >= ").push_bind(min);
        }
        if let Some(max) = self.max_score {
            qb.push(" AND overall_score <= ").push_bind(max);
        }
        if let Some(county) = &self.county {
            qb.push(" AND county = ").push_bind(county.clone());
        }
        if let Some(municipality) = &self.municipality {
            qb.push(" AND municipality = ").push_bind(municipality.clone());
        }
        if let Some(prefix) = &self.industry_prefix {
            qb.push(" AND industry_code LIKE ")
                .push_bind(format!("{prefix}%"));
        }
        if let Some(search) = &self.search {
            qb.push(" AND (name ILIKE ")
                .push_bind(format!("%{search}%"))
                .push(" OR orgnr = ")
                .push_bind(search.clone())
                .push(")");
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompanyPage {
    pub companies: Vec<EntitySnapshot>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct CompanyDetail {
    pub company: EntitySnapshot,
    pub explanations: Vec<ScoreSignal>,
    pub roles: Vec<EntityRole>,
    pub sub_entities: Vec<SubEntity>,
}

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_companies: i64,
    pub active_companies: i64,
    pub high_score_leads: i64,
    pub average_score: f64,
    pub by_county: Vec<(String, i64)>,
    pub score_distribution: Vec<(String, i64)>,
}

#[derive(Debug, Clone)]
pub struct ExportRow {
    pub company: EntitySnapshot,
    pub top_reasons: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ExplanationRow {
    orgnr: String,
    signal: String,
    weight: i32,
    reason: String,
    active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    orgnr: String,
    role_type: String,
    role_group: String,
    person_name: Option<String>,
    birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubEntityRow {
    id: Uuid,
    orgnr: String,
    parent_orgnr: String,
    name: String,
    industry_code: Option<String>,
    address: Option<String>,
    municipality: Option<String>,
    created_at: DateTime<Utc>,
}

const SCORE_BUCKET_LABELS: [&str; 5] = ["0-19", "20-39", "40-59", "60-79", "80-100"];

/// Read-only query surface consumed by the API and the exporter.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, score-sorted page of companies plus the total match count.
    pub async fn list_companies(
        &self,
        filter: &CompanyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<CompanyPage> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM companies WHERE TRUE");
        filter.push_where(&mut count_qb);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::new("SELECT * FROM companies WHERE TRUE");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY overall_score DESC, name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<CompanyRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let companies = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok(CompanyPage { companies, total })
    }

    pub async fn company_detail(&self, orgnr: &str) -> Result<Option<CompanyDetail>> {
        let row = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE orgnr = $1")
            .bind(orgnr)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let company: EntitySnapshot = row.try_into()?;

        let explanations = sqlx::query_as::<_, ExplanationRow>(
            "SELECT orgnr, signal, weight, reason, active FROM score_explanations WHERE orgnr = $1 ORDER BY weight DESC, signal ASC",
        )
        .bind(orgnr)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| ScoreSignal {
            signal: r.signal,
            weight: r.weight,
            reason: r.reason,
            active: r.active,
        })
        .collect();

        let roles = sqlx::query_as::<_, RoleRow>(
            "SELECT id, orgnr, role_type, role_group, person_name, birth_date FROM company_roles WHERE orgnr = $1 ORDER BY role_group, role_type",
        )
        .bind(orgnr)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| EntityRole {
            id: r.id,
            orgnr: r.orgnr,
            role_type: r.role_type,
            role_group: r.role_group,
            person_name: r.person_name,
            birth_date: r.birth_date,
        })
        .collect();

        let sub_entities = sqlx::query_as::<_, SubEntityRow>(
            "SELECT id, orgnr, parent_orgnr, name, industry_code, address, municipality, created_at FROM sub_entities WHERE parent_orgnr = $1 ORDER BY name",
        )
        .bind(orgnr)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| SubEntity {
            id: r.id,
            orgnr: r.orgnr,
            parent_orgnr: r.parent_orgnr,
            name: r.name,
            industry_code: r.industry_code,
            address: r.address,
            municipality: r.municipality,
            created_at: r.created_at,
        })
        .collect();

        Ok(Some(CompanyDetail {
            company,
            explanations,
            roles,
            sub_entities,
        }))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (total_companies, active_companies, high_score_leads, average_score): (
            i64,
            i64,
            i64,
            Option<f64>,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'active'),
                   COUNT(*) FILTER (WHERE overall_score >= $1),
                   AVG(overall_score)::float8
            FROM companies
            "#,
        )
        .bind(HIGH_SCORE_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        let by_county: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT county, COUNT(*) FROM companies
            WHERE county IS NOT NULL
            GROUP BY county
            ORDER BY COUNT(*) DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let buckets: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT LEAST(overall_score / 20, 4)::int4, COUNT(*)
            FROM companies
            GROUP BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut score_distribution: Vec<(String, i64)> = SCORE_BUCKET_LABELS
            .iter()
            .map(|label| (label.to_string(), 0))
            .collect();
        for (bucket, count) in buckets {
            if let Some(slot) = score_distribution.get_mut(bucket.clamp(0, 4) as usize) {
                slot.1 = count;
            }
        }

        Ok(DashboardStats {
            total_companies,
            active_companies,
            high_score_leads,
            average_score: average_score.unwrap_or(0.0),
            by_county,
            score_distribution,
        })
    }

    /// Rows for CSV export: filtered companies (capped) with their top-3
    /// active reasons resolved in one round trip.
    pub async fn export_rows(&self, filter: &CompanyFilter, cap: i64) -> Result<Vec<ExportRow>> {
        let mut qb = QueryBuilder::new("SELECT * FROM companies WHERE TRUE");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY overall_score DESC, name ASC LIMIT ")
            .push_bind(cap);

        let rows: Vec<CompanyRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let companies = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<EntitySnapshot>>>()?;

        let orgnrs: Vec<String> = companies.iter().map(|c| c.orgnr.clone()).collect();
        let explanation_rows = sqlx::query_as::<_, ExplanationRow>(
            r#"
            SELECT orgnr, signal, weight, reason, active
            FROM score_explanations
            WHERE orgnr = ANY($1) AND active = TRUE
            ORDER BY weight DESC
            "#,
        )
        .bind(&orgnrs)
        .fetch_all(&self.pool)
        .await?;

        let mut reasons_by_orgnr: HashMap<String, Vec<String>> = HashMap::new();
        for row in explanation_rows {
            let reasons = reasons_by_orgnr.entry(row.orgnr).or_default();
            if reasons.len() < 3 {
                reasons.push(row.reason);
            }
        }

        Ok(companies
            .into_iter()
            .map(|company| {
                let top_reasons = reasons_by_orgnr.remove(&company.orgnr).unwrap_or_default();
                ExportRow {
                    company,
                    top_reasons,
                }
            })
            .collect())
    }
}
