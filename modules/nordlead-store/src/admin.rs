use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// A persisted custom scoring model. `config` holds the serialized signal
/// list (closed-form expressions, see the sync crate's model module).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoringModelRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Integration {
    pub id: Uuid,
    pub integration_type: String,
    pub name: String,
    pub config: serde_json::Value,
    pub events: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Scoring models, integrations and the audit trail.
#[derive(Clone)]
pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Scoring models ---

    pub async fn create_model(
        &self,
        name: &str,
        description: Option<&str>,
        config: &serde_json::Value,
    ) -> Result<ScoringModelRecord> {
        let record = sqlx::query_as::<_, ScoringModelRecord>(
            r#"
            INSERT INTO scoring_models (name, description, config)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(config)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_model(&self, id: Uuid) -> Result<Option<ScoringModelRecord>> {
        let record = sqlx::query_as::<_, ScoringModelRecord>(
            "SELECT * FROM scoring_models WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_models(&self) -> Result<Vec<ScoringModelRecord>> {
        let records = sqlx::query_as::<_, ScoringModelRecord>(
            "SELECT * FROM scoring_models ORDER BY is_default DESC, is_active DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// The single active model, if any. Activation clears the flag on every
    /// other model first, in one transaction.
    pub async fn active_model(&self) -> Result<Option<ScoringModelRecord>> {
        let record = sqlx::query_as::<_, ScoringModelRecord>(
            "SELECT * FROM scoring_models WHERE is_active = TRUE LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn activate_model(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE scoring_models SET is_active = FALSE WHERE is_active = TRUE")
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE scoring_models SET is_active = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_model(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM scoring_models WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Integrations ---

    pub async fn create_integration(
        &self,
        integration_type: &str,
        name: &str,
        config: &serde_json::Value,
        events: &[String],
    ) -> Result<Integration> {
        let integration = sqlx::query_as::<_, Integration>(
            r#"
            INSERT INTO integrations (integration_type, name, config, events)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(integration_type)
        .bind(name)
        .bind(config)
        .bind(events)
        .fetch_one(&self.pool)
        .await?;

        Ok(integration)
    }

    pub async fn list_integrations(&self) -> Result<Vec<Integration>> {
        let integrations = sqlx::query_as::<_, Integration>(
            "SELECT * FROM integrations ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(integrations)
    }

    /// Active integrations subscribed to `event`.
    pub async fn integrations_for_event(&self, event: &str) -> Result<Vec<Integration>> {
        let integrations = sqlx::query_as::<_, Integration>(
            "SELECT * FROM integrations WHERE is_active = TRUE AND $1 = ANY(events)",
        )
        .bind(event)
        .fetch_all(&self.pool)
        .await?;

        Ok(integrations)
    }

    pub async fn delete_integration(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM integrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn log_delivery(
        &self,
        integration_id: Uuid,
        event: &str,
        success: bool,
        detail: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO integration_logs (integration_id, event, success, detail)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(integration_id)
        .bind(event)
        .bind(success)
        .bind(detail)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- Audit trail ---

    pub async fn record_audit(
        &self,
        action: &str,
        entity_type: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (action, entity_type, metadata) VALUES ($1, $2, $3)",
        )
        .bind(action)
        .bind(entity_type)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
