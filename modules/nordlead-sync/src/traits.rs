//! Trait seams for the orchestrator's collaborators.
//!
//! The registry and both stores sit behind traits so the sync flows can be
//! driven in tests with scripted fixtures: no network, no database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use nordlead_common::{
    EntitySnapshot, JobType, NewRole, NewSnapshot, NewSubEntity, ScoringResult, SyncJob,
};
use registry_client::{BranchRecord, ListFilters, RegistryClient, RegistryRecord, RoleGroup};

// ---------------------------------------------------------------------------
// Registry — upstream capability interface
// ---------------------------------------------------------------------------

/// The registry operations the sync flows consume. Errors keep the client's
/// transient/permanent classification so the orchestrator can distinguish a
/// missing record from an exhausted retry budget.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn fetch_page(
        &self,
        page: u32,
        size: u32,
        filters: &ListFilters,
    ) -> registry_client::Result<(Vec<RegistryRecord>, bool)>;

    async fn fetch_by_id(&self, orgnr: &str) -> registry_client::Result<RegistryRecord>;

    async fn fetch_changes_since(
        &self,
        since: NaiveDate,
        page: u32,
        size: u32,
    ) -> registry_client::Result<(Vec<String>, bool)>;

    async fn fetch_relations(&self, orgnr: &str) -> registry_client::Result<Vec<RoleGroup>>;

    async fn fetch_branch_page(
        &self,
        page: u32,
        size: u32,
    ) -> registry_client::Result<(Vec<BranchRecord>, bool)>;
}

#[async_trait]
impl Registry for RegistryClient {
    async fn fetch_page(
        &self,
        page: u32,
        size: u32,
        filters: &ListFilters,
    ) -> registry_client::Result<(Vec<RegistryRecord>, bool)> {
        RegistryClient::fetch_page(self, page, size, filters).await
    }

    async fn fetch_by_id(&self, orgnr: &str) -> registry_client::Result<RegistryRecord> {
        RegistryClient::fetch_by_id(self, orgnr).await
    }

    async fn fetch_changes_since(
        &self,
        since: NaiveDate,
        page: u32,
        size: u32,
    ) -> registry_client::Result<(Vec<String>, bool)> {
        RegistryClient::fetch_changes_since(self, since, page, size).await
    }

    async fn fetch_relations(&self, orgnr: &str) -> registry_client::Result<Vec<RoleGroup>> {
        RegistryClient::fetch_relations(self, orgnr).await
    }

    async fn fetch_branch_page(
        &self,
        page: u32,
        size: u32,
    ) -> registry_client::Result<(Vec<BranchRecord>, bool)> {
        RegistryClient::fetch_branch_page(self, page, size).await
    }
}

// ---------------------------------------------------------------------------
// EntityStore / JobStore — persistence seams
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Create or update by orgnr. `last_seen_at` never moves backwards.
    async fn upsert_snapshot(
        &self,
        snapshot: &NewSnapshot,
        seen_at: DateTime<Utc>,
    ) -> Result<EntitySnapshot>;

    async fn get_by_orgnr(&self, orgnr: &str) -> Result<Option<EntitySnapshot>>;

    async fn sub_entity_count(&self, orgnr: &str) -> Result<i64>;

    /// Write score columns and replace the explanation set atomically.
    async fn apply_scores(&self, orgnr: &str, result: &ScoringResult) -> Result<()>;

    async fn parent_exists(&self, parent_orgnr: &str) -> Result<bool>;

    async fn upsert_sub_entity(&self, branch: &NewSubEntity) -> Result<()>;

    async fn roles_backlog(&self, limit: i64) -> Result<Vec<String>>;

    /// Replace the role set and mark role data loaded atomically.
    async fn replace_roles(&self, orgnr: &str, roles: &[NewRole]) -> Result<()>;

    async fn set_summary(&self, orgnr: &str, summary: &str) -> Result<()>;
}

#[async_trait]
impl EntityStore for nordlead_store::PgEntityStore {
    async fn upsert_snapshot(
        &self,
        snapshot: &NewSnapshot,
        seen_at: DateTime<Utc>,
    ) -> Result<EntitySnapshot> {
        Ok(nordlead_store::PgEntityStore::upsert_snapshot(self, snapshot, seen_at).await?)
    }

    async fn get_by_orgnr(&self, orgnr: &str) -> Result<Option<EntitySnapshot>> {
        Ok(nordlead_store::PgEntityStore::get_by_orgnr(self, orgnr).await?)
    }

    async fn sub_entity_count(&self, orgnr: &str) -> Result<i64> {
        Ok(nordlead_store::PgEntityStore::sub_entity_count(self, orgnr).await?)
    }

    async fn apply_scores(&self, orgnr: &str, result: &ScoringResult) -> Result<()> {
        Ok(nordlead_store::PgEntityStore::apply_scores(self, orgnr, result).await?)
    }

    async fn parent_exists(&self, parent_orgnr: &str) -> Result<bool> {
        Ok(nordlead_store::PgEntityStore::parent_exists(self, parent_orgnr).await?)
    }

    async fn upsert_sub_entity(&self, branch: &NewSubEntity) -> Result<()> {
        Ok(nordlead_store::PgEntityStore::upsert_sub_entity(self, branch).await?)
    }

    async fn roles_backlog(&self, limit: i64) -> Result<Vec<String>> {
        Ok(nordlead_store::PgEntityStore::roles_backlog(self, limit).await?)
    }

    async fn replace_roles(&self, orgnr: &str, roles: &[NewRole]) -> Result<()> {
        Ok(nordlead_store::PgEntityStore::replace_roles(self, orgnr, roles).await?)
    }

    async fn set_summary(&self, orgnr: &str, summary: &str) -> Result<()> {
        Ok(nordlead_store::PgEntityStore::set_summary(self, orgnr, summary).await?)
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job_type: JobType) -> Result<SyncJob>;

    async fn mark_completed(&self, id: Uuid, processed: i32, errors: i32, log: &str)
        -> Result<()>;

    async fn mark_failed(&self, id: Uuid, processed: i32, errors: i32, log: &str) -> Result<()>;

    /// The incremental checkpoint: `finished_at` of the most recent
    /// completed job of this type.
    async fn last_completed_finished_at(
        &self,
        job_type: JobType,
    ) -> Result<Option<DateTime<Utc>>>;
}

#[async_trait]
impl JobStore for nordlead_store::PgJobStore {
    async fn create(&self, job_type: JobType) -> Result<SyncJob> {
        Ok(nordlead_store::PgJobStore::create(self, job_type).await?)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> Result<()> {
        Ok(nordlead_store::PgJobStore::mark_completed(self, id, processed, errors, log).await?)
    }

    async fn mark_failed(&self, id: Uuid, processed: i32, errors: i32, log: &str) -> Result<()> {
        Ok(nordlead_store::PgJobStore::mark_failed(self, id, processed, errors, log).await?)
    }

    async fn last_completed_finished_at(
        &self,
        job_type: JobType,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(nordlead_store::PgJobStore::last_completed_finished_at(self, job_type).await?)
    }
}
