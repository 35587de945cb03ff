use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use nordlead_common::{JobStatus, JobType, SyncJob};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub job_type: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed_count: i32,
    pub error_count: i32,
    pub log: Option<String>,
}

impl TryFrom<JobRow> for SyncJob {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        let job_type: JobType = row
            .job_type
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("job {}: {e}", row.id)))?;
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("job {}: {e}", row.id)))?;
        Ok(SyncJob {
            id: row.id,
            job_type,
            status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            processed_count: row.processed_count,
            error_count: row.error_count,
            log: row.log,
        })
    }
}

/// Postgres persistence for sync jobs. A job is created `running` and moved
/// to a terminal state exactly once; the guarded UPDATEs enforce that.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job_type: JobType) -> Result<SyncJob> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO sync_jobs (job_type, status, started_at)
            VALUES ($1, 'running', now())
            RETURNING id, job_type, status, started_at, finished_at,
                      processed_count, error_count, log
            "#,
        )
        .bind(job_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> Result<()> {
        self.finish(id, JobStatus::Completed, processed, errors, log)
            .await
    }

    pub async fn mark_failed(&self, id: Uuid, processed: i32, errors: i32, log: &str) -> Result<()> {
        self.finish(id, JobStatus::Failed, processed, errors, log)
            .await
    }

    async fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                status = $2,
                finished_at = now(),
                processed_count = $3,
                error_count = $4,
                log = $5
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(processed)
        .bind(errors)
        .bind(log)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotRunning(id));
        }
        Ok(())
    }

    /// `finished_at` of the most recent completed job of the given type —
    /// the incremental checkpoint.
    pub async fn last_completed_finished_at(
        &self,
        job_type: JobType,
    ) -> Result<Option<DateTime<Utc>>> {
        let finished_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT finished_at FROM sync_jobs
            WHERE job_type = $1 AND status = 'completed'
            ORDER BY finished_at DESC
            LIMIT 1
            "#,
        )
        .bind(job_type.as_str())
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        Ok(finished_at)
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<SyncJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, job_type, status, started_at, finished_at,
                   processed_count, error_count, log
            FROM sync_jobs
            ORDER BY started_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
