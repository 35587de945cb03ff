use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use nordlead_common::{
    EntitySnapshot, EntityStatus, NewRole, NewSnapshot, NewSubEntity, ScoringResult,
};

use crate::error::{Result, StoreError};

/// A row from the companies table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub orgnr: String,
    pub name: String,
    pub status: String,
    pub organization_form_code: Option<String>,
    pub organization_form_name: Option<String>,
    pub founded_date: Option<NaiveDate>,
    pub municipality: Option<String>,
    pub municipality_number: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub industry_code: Option<String>,
    pub industry_description: Option<String>,
    pub employee_count: Option<i32>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub role_data_loaded: bool,
    pub ai_summary: Option<String>,
    pub overall_score: i32,
    pub use_case_fit: i32,
    pub urgency_score: i32,
    pub data_quality_score: i32,
    pub last_seen_at: DateTime<Utc>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for EntitySnapshot {
    type Error = StoreError;

    fn try_from(row: CompanyRow) -> Result<Self> {
        let status: EntityStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("company {}: {e}", row.orgnr)))?;
        Ok(EntitySnapshot {
            id: row.id,
            orgnr: row.orgnr,
            name: row.name,
            status,
            organization_form_code: row.organization_form_code,
            organization_form_name: row.organization_form_name,
            founded_date: row.founded_date,
            municipality: row.municipality,
            municipality_number: row.municipality_number,
            county: row.county,
            postal_code: row.postal_code,
            address: row.address,
            industry_code: row.industry_code,
            industry_description: row.industry_description,
            employee_count: row.employee_count,
            phone: row.phone,
            website: row.website,
            email: row.email,
            logo_url: row.logo_url,
            role_data_loaded: row.role_data_loaded,
            ai_summary: row.ai_summary,
            overall_score: row.overall_score,
            use_case_fit: row.use_case_fit,
            urgency_score: row.urgency_score,
            data_quality_score: row.data_quality_score,
            last_seen_at: row.last_seen_at,
            source_updated_at: row.source_updated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres persistence for entity snapshots and their related rows.
#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create or update a snapshot by orgnr. Mapper-owned columns are
    /// overwritten; scores, the role flag and the AI summary are untouched.
    /// `last_seen_at` only ever moves forward.
    pub async fn upsert_snapshot(
        &self,
        snapshot: &NewSnapshot,
        seen_at: DateTime<Utc>,
    ) -> Result<EntitySnapshot> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            INSERT INTO companies
                (orgnr, name, status, organization_form_code, organization_form_name,
                 founded_date, municipality, municipality_number, county, postal_code,
                 address, industry_code, industry_description, employee_count,
                 phone, website, email, logo_url, source_updated_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (orgnr) DO UPDATE SET
                name = EXCLUDED.name,
                status = EXCLUDED.status,
                organization_form_code = EXCLUDED.organization_form_code,
                organization_form_name = EXCLUDED.organization_form_name,
                founded_date = EXCLUDED.founded_date,
                municipality = EXCLUDED.municipality,
                municipality_number = EXCLUDED.municipality_number,
                county = EXCLUDED.county,
                postal_code = EXCLUDED.postal_code,
                address = EXCLUDED.address,
                industry_code = EXCLUDED.industry_code,
                industry_description = EXCLUDED.industry_description,
                employee_count = EXCLUDED.employee_count,
                phone = EXCLUDED.phone,
                website = EXCLUDED.website,
                email = EXCLUDED.email,
                logo_url = COALESCE(EXCLUDED.logo_url, companies.logo_url),
                source_updated_at = EXCLUDED.source_updated_at,
                last_seen_at = GREATEST(companies.last_seen_at, EXCLUDED.last_seen_at),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(&snapshot.orgnr)
        .bind(&snapshot.name)
        .bind(snapshot.status.as_str())
        .bind(&snapshot.organization_form_code)
        .bind(&snapshot.organization_form_name)
        .bind(snapshot.founded_date)
        .bind(&snapshot.municipality)
        .bind(&snapshot.municipality_number)
        .bind(&snapshot.county)
        .bind(&snapshot.postal_code)
        .bind(&snapshot.address)
        .bind(&snapshot.industry_code)
        .bind(&snapshot.industry_description)
        .bind(snapshot.employee_count)
        .bind(&snapshot.phone)
        .bind(&snapshot.website)
        .bind(&snapshot.email)
        .bind(&snapshot.logo_url)
        .bind(snapshot.source_updated_at)
        .bind(seen_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    pub async fn get_by_orgnr(&self, orgnr: &str) -> Result<Option<EntitySnapshot>> {
        let row = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE orgnr = $1")
            .bind(orgnr)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn sub_entity_count(&self, orgnr: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sub_entities WHERE parent_orgnr = $1",
        )
        .bind(orgnr)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Write the four score columns and replace the explanation set, all in
    /// one transaction. A concurrent reader sees the prior complete set or
    /// the new complete set, never an empty intermediate state.
    pub async fn apply_scores(&self, orgnr: &str, result: &ScoringResult) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE companies SET
                overall_score = $2,
                use_case_fit = $3,
                urgency_score = $4,
                data_quality_score = $5,
                updated_at = now()
            WHERE orgnr = $1
            "#,
        )
        .bind(orgnr)
        .bind(result.overall)
        .bind(result.use_case_fit)
        .bind(result.urgency)
        .bind(result.data_quality)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM score_explanations WHERE orgnr = $1")
            .bind(orgnr)
            .execute(&mut *tx)
            .await?;

        for signal in &result.signals {
            sqlx::query(
                r#"
                INSERT INTO score_explanations (orgnr, signal, weight, reason, active)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(orgnr)
            .bind(&signal.signal)
            .bind(signal.weight)
            .bind(&signal.reason)
            .bind(signal.active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn parent_exists(&self, parent_orgnr: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM companies WHERE orgnr = $1)",
        )
        .bind(parent_orgnr)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn upsert_sub_entity(&self, branch: &NewSubEntity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sub_entities (orgnr, parent_orgnr, name, industry_code, address, municipality)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (orgnr) DO UPDATE SET
                parent_orgnr = EXCLUDED.parent_orgnr,
                name = EXCLUDED.name,
                industry_code = EXCLUDED.industry_code,
                address = EXCLUDED.address,
                municipality = EXCLUDED.municipality
            "#,
        )
        .bind(&branch.orgnr)
        .bind(&branch.parent_orgnr)
        .bind(&branch.name)
        .bind(&branch.industry_code)
        .bind(&branch.address)
        .bind(&branch.municipality)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Active entities still missing role data, oldest first, capped.
    pub async fn roles_backlog(&self, limit: i64) -> Result<Vec<String>> {
        let orgnrs = sqlx::query_scalar::<_, String>(
            r#"
            SELECT orgnr FROM companies
            WHERE status = 'active' AND role_data_loaded = FALSE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orgnrs)
    }

    /// Replace the role set for an entity and mark role data as loaded, in
    /// one transaction.
    pub async fn replace_roles(&self, orgnr: &str, roles: &[NewRole]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM company_roles WHERE orgnr = $1")
            .bind(orgnr)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            sqlx::query(
                r#"
                INSERT INTO company_roles (orgnr, role_type, role_group, person_name, birth_date)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(orgnr)
            .bind(&role.role_type)
            .bind(&role.role_group)
            .bind(&role.person_name)
            .bind(role.birth_date)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE companies SET role_data_loaded = TRUE, updated_at = now() WHERE orgnr = $1",
        )
        .bind(orgnr)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_summary(&self, orgnr: &str, summary: &str) -> Result<()> {
        sqlx::query("UPDATE companies SET ai_summary = $2, updated_at = now() WHERE orgnr = $1")
            .bind(orgnr)
            .bind(summary)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
