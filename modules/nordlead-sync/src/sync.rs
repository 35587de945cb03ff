//! The sync orchestrator: four run variants over one job lifecycle.
//!
//! Pages are processed strictly in increasing order — the incremental
//! checkpoint is this run's `finished_at`, so run boundaries must be honest.
//! Records within a page fan out on a bounded worker pool; a record failure
//! is counted and never aborts the run, a page fetch failure (after the
//! client's retries) fails the whole job with counters preserved.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use nordlead_common::{
    Config, JobType, NewRole, RelatedCounts, ScoringResult, SUMMARY_SCORE_THRESHOLD,
};
use registry_client::{BranchRecord, ListFilters, RegistryRecord, RoleGroup, RolePerson};

use crate::logo::LogoFinder;
use crate::mapper;
use crate::scoring;
use crate::summary::Summarizer;
use crate::traits::{EntityStore, JobStore, Registry};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    /// Runaway guard for the pagination loops, not a tuning parameter.
    pub max_pages: u32,
    /// In-page worker pool size. Client retries block only the record's
    /// worker, so this is also the knob against head-of-line blocking from
    /// slow retries.
    pub concurrency: usize,
    /// Change-feed lookback when no completed incremental job exists yet.
    pub lookback_days: i64,
    /// Cap on entities handled per roles run.
    pub roles_batch: i64,
    /// Generate AI summaries for strong leads during ingestion.
    pub generate_summaries: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 1000,
            concurrency: 8,
            lookback_days: 1,
            roles_batch: 1000,
            generate_summaries: false,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.sync_page_size,
            max_pages: config.sync_max_pages,
            concurrency: config.sync_concurrency,
            lookback_days: config.sync_lookback_days,
            roles_batch: config.sync_roles_batch,
            generate_summaries: false,
        }
    }
}

/// Counters from one run. Exact at the terminal state; in-flight values are
/// only ever read for progress logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub processed: u32,
    pub errors: u32,
    pub pages: u32,
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Sync Run Complete ===")?;
        writeln!(f, "Processed: {}", self.processed)?;
        writeln!(f, "Errors:    {}", self.errors)?;
        writeln!(f, "Pages:     {}", self.pages)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub stats: SyncStats,
}

/// Drives ingestion runs against the registry and the stores. Constructed
/// once at process start; collaborators are explicit dependencies, not
/// globals.
pub struct SyncOrchestrator {
    registry: Arc<dyn Registry>,
    entities: Arc<dyn EntityStore>,
    jobs: Arc<dyn JobStore>,
    logos: Option<LogoFinder>,
    summarizer: Option<Summarizer>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        registry: Arc<dyn Registry>,
        entities: Arc<dyn EntityStore>,
        jobs: Arc<dyn JobStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            registry,
            entities,
            jobs,
            logos: None,
            summarizer: None,
            options,
        }
    }

    pub fn with_logo_finder(mut self, logos: LogoFinder) -> Self {
        self.logos = Some(logos);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Run one job of the given type. The job row is created `running` and
    /// moved to exactly one terminal state; a process kill in between leaves
    /// it `running` for an external operator to reconcile.
    pub async fn run(&self, job_type: JobType) -> Result<SyncReport> {
        let job = self
            .jobs
            .create(job_type)
            .await
            .context("Failed to create sync job")?;
        info!(job_id = %job.id, job_type = %job_type, "Sync run started");

        let mut stats = SyncStats::default();
        let outcome = match job_type {
            JobType::Full => self.full_pass(&mut stats).await,
            JobType::Incremental => self.incremental_pass(&mut stats).await,
            JobType::Roles => self.roles_pass(&mut stats).await,
            JobType::Subentities => self.sub_entity_pass(&mut stats).await,
        };

        match outcome {
            Ok(log) => {
                if let Err(err) = self
                    .jobs
                    .mark_completed(job.id, stats.processed as i32, stats.errors as i32, &log)
                    .await
                {
                    // A run whose record cannot reach a terminal state
                    // counts as failed.
                    error!(job_id = %job.id, error = %err, "Failed to finalize sync job");
                    if let Err(mark_err) = self
                        .jobs
                        .mark_failed(
                            job.id,
                            stats.processed as i32,
                            stats.errors as i32,
                            "Failed: could not finalize job record",
                        )
                        .await
                    {
                        error!(job_id = %job.id, error = %mark_err, "Failed to mark job as failed");
                    }
                    return Err(err.context("Failed to finalize sync job"));
                }
                info!(
                    job_id = %job.id,
                    processed = stats.processed,
                    errors = stats.errors,
                    pages = stats.pages,
                    "Sync run completed"
                );
                Ok(SyncReport {
                    job_id: job.id,
                    job_type,
                    stats,
                })
            }
            Err(err) => {
                let log = format!("Failed: {err:#}");
                if let Err(mark_err) = self
                    .jobs
                    .mark_failed(job.id, stats.processed as i32, stats.errors as i32, &log)
                    .await
                {
                    error!(job_id = %job.id, error = %mark_err, "Failed to mark job as failed");
                }
                warn!(job_id = %job.id, error = %err, "Sync run failed");
                Err(err)
            }
        }
    }

    pub async fn run_full(&self) -> Result<SyncReport> {
        self.run(JobType::Full).await
    }

    pub async fn run_incremental(&self) -> Result<SyncReport> {
        self.run(JobType::Incremental).await
    }

    /// Load decision-maker roles for entities still missing them.
    ///
    /// Known limitation, kept on purpose: this flow sets the role flag but
    /// does not rescore, even though "roles loaded" is a scoring signal. An
    /// entity's score lags its own explanation set until the next full or
    /// incremental pass touches it.
    pub async fn run_roles(&self) -> Result<SyncReport> {
        self.run(JobType::Roles).await
    }

    pub async fn run_sub_entities(&self) -> Result<SyncReport> {
        self.run(JobType::Subentities).await
    }

    // --- Full ---

    async fn full_pass(&self, stats: &mut SyncStats) -> Result<String> {
        let mut page = 0u32;
        loop {
            debug!(page, "Fetching entity page");
            let (records, has_next) = self
                .registry
                .fetch_page(page, self.options.page_size, &ListFilters::default())
                .await
                .with_context(|| format!("Failed to fetch entity page {page}"))?;
            if records.is_empty() {
                break;
            }

            let outcomes: Vec<bool> =
                stream::iter(records.into_iter().map(|record| async move { self.ingest_record(&record).await }))
                    .buffer_unordered(self.options.concurrency)
                    .collect()
                    .await;
            tally(stats, &outcomes);

            stats.pages += 1;
            page += 1;
            if !has_next {
                break;
            }
            if page >= self.options.max_pages {
                warn!(page, "Safety page cap reached, stopping");
                break;
            }
        }

        Ok(format!(
            "Synced {} entities with {} errors",
            stats.processed, stats.errors
        ))
    }

    async fn ingest_record(&self, record: &RegistryRecord) -> bool {
        match self.ingest_record_inner(record).await {
            Ok(orgnr) => {
                debug!(orgnr = %orgnr, "Entity ingested");
                true
            }
            Err(err) => {
                warn!(error = %err, "Failed to ingest record");
                false
            }
        }
    }

    /// Map → upsert → score → replace explanations, plus the best-effort
    /// extras (logo, summary) that never fail the record.
    async fn ingest_record_inner(&self, record: &RegistryRecord) -> Result<String> {
        let mut snapshot = mapper::map_record(record)?;

        if let Some(logos) = &self.logos {
            if let Some(website) = snapshot.website.clone() {
                snapshot.logo_url = logos.find(&website).await;
            }
        }

        let stored = self.entities.upsert_snapshot(&snapshot, Utc::now()).await?;
        let result = self.rescore(&stored).await?;

        if self.options.generate_summaries && result.overall >= SUMMARY_SCORE_THRESHOLD {
            if let Some(summarizer) = &self.summarizer {
                let text = summarizer.summarize(&stored).await;
                if let Err(err) = self.entities.set_summary(&stored.orgnr, &text).await {
                    warn!(orgnr = %stored.orgnr, error = %err, "Failed to store summary");
                }
            }
        }

        Ok(stored.orgnr)
    }

    async fn rescore(&self, stored: &nordlead_common::EntitySnapshot) -> Result<ScoringResult> {
        let related = RelatedCounts {
            sub_entities: self.entities.sub_entity_count(&stored.orgnr).await?,
        };
        let result = scoring::score(stored, &related, Utc::now());
        self.entities.apply_scores(&stored.orgnr, &result).await?;
        Ok(result)
    }

    // --- Incremental ---

    async fn incremental_pass(&self, stats: &mut SyncStats) -> Result<String> {
        let checkpoint = self
            .jobs
            .last_completed_finished_at(JobType::Incremental)
            .await
            .context("Failed to read incremental checkpoint")?;
        let since = checkpoint
            .unwrap_or_else(|| Utc::now() - Duration::days(self.options.lookback_days))
            .date_naive();
        info!(since = %since, "Incremental sync from checkpoint");

        let mut page = 0u32;
        loop {
            let (changed_ids, has_next) = self
                .registry
                .fetch_changes_since(since, page, self.options.page_size)
                .await
                .with_context(|| format!("Failed to fetch change page {page}"))?;
            if changed_ids.is_empty() {
                break;
            }

            let outcomes: Vec<bool> =
                stream::iter(changed_ids.into_iter().map(|orgnr| async move { self.refresh_entity(&orgnr).await }))
                    .buffer_unordered(self.options.concurrency)
                    .collect()
                    .await;
            tally(stats, &outcomes);

            stats.pages += 1;
            page += 1;
            if !has_next {
                break;
            }
            if page >= self.options.max_pages {
                warn!(page, "Safety page cap reached, stopping");
                break;
            }
        }

        Ok(format!(
            "Synced {} updates since {} with {} errors",
            stats.processed, since, stats.errors
        ))
    }

    async fn refresh_entity(&self, orgnr: &str) -> bool {
        match self.refresh_entity_inner(orgnr).await {
            Ok(()) => true,
            Err(err) => {
                warn!(orgnr, error = %err, "Failed to refresh changed entity");
                false
            }
        }
    }

    async fn refresh_entity_inner(&self, orgnr: &str) -> Result<()> {
        let record = self.registry.fetch_by_id(orgnr).await?;
        self.ingest_record_inner(&record).await?;
        Ok(())
    }

    // --- Roles ---

    async fn roles_pass(&self, stats: &mut SyncStats) -> Result<String> {
        let backlog = self
            .entities
            .roles_backlog(self.options.roles_batch)
            .await
            .context("Failed to select roles backlog")?;
        info!(count = backlog.len(), "Syncing roles");

        let outcomes: Vec<bool> =
            stream::iter(backlog.into_iter().map(|orgnr| async move { self.load_roles(&orgnr).await }))
                .buffer_unordered(self.options.concurrency)
                .collect()
                .await;
        tally(stats, &outcomes);

        Ok(format!(
            "Synced roles for {} entities with {} errors",
            stats.processed, stats.errors
        ))
    }

    async fn load_roles(&self, orgnr: &str) -> bool {
        match self.load_roles_inner(orgnr).await {
            Ok(count) => {
                debug!(orgnr, roles = count, "Roles loaded");
                true
            }
            Err(err) => {
                warn!(orgnr, error = %err, "Failed to load roles");
                false
            }
        }
    }

    async fn load_roles_inner(&self, orgnr: &str) -> Result<usize> {
        let groups = self.registry.fetch_relations(orgnr).await?;
        let roles = collect_roles(&groups);
        self.entities.replace_roles(orgnr, &roles).await?;
        Ok(roles.len())
    }

    // --- Sub-entities ---

    async fn sub_entity_pass(&self, stats: &mut SyncStats) -> Result<String> {
        let mut page = 0u32;
        loop {
            debug!(page, "Fetching branch page");
            let (records, has_next) = self
                .registry
                .fetch_branch_page(page, self.options.page_size)
                .await
                .with_context(|| format!("Failed to fetch branch page {page}"))?;
            if records.is_empty() {
                break;
            }

            let outcomes: Vec<bool> =
                stream::iter(records.into_iter().map(|record| async move { self.ingest_branch(&record).await }))
                    .buffer_unordered(self.options.concurrency)
                    .collect()
                    .await;
            tally(stats, &outcomes);

            stats.pages += 1;
            page += 1;
            if !has_next {
                break;
            }
            if page >= self.options.max_pages {
                warn!(page, "Safety page cap reached, stopping");
                break;
            }
        }

        Ok(format!(
            "Synced {} sub-entities with {} errors",
            stats.processed, stats.errors
        ))
    }

    async fn ingest_branch(&self, record: &BranchRecord) -> bool {
        match self.ingest_branch_inner(record).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Failed to ingest branch");
                false
            }
        }
    }

    /// A branch whose parent is unknown locally is dropped, not an error —
    /// the main register is the source of truth for which parents exist.
    async fn ingest_branch_inner(&self, record: &BranchRecord) -> Result<()> {
        let mapped = mapper::map_branch(record)?;

        let Some(parent) = mapped.parent_orgnr.clone() else {
            debug!(orgnr = %mapped.orgnr, "Branch has no parent, dropping");
            return Ok(());
        };
        if !self.entities.parent_exists(&parent).await? {
            debug!(orgnr = %mapped.orgnr, parent = %parent, "Parent not found locally, dropping branch");
            return Ok(());
        }

        self.entities
            .upsert_sub_entity(&mapped.into_sub_entity(parent))
            .await?;
        Ok(())
    }
}

fn tally(stats: &mut SyncStats, outcomes: &[bool]) {
    for &ok in outcomes {
        if ok {
            stats.processed += 1;
        } else {
            stats.errors += 1;
        }
    }
}

fn collect_roles(groups: &[RoleGroup]) -> Vec<NewRole> {
    groups
        .iter()
        .flat_map(|group| {
            group.roles.iter().filter(|r| !r.resigned).map(|role| NewRole {
                role_type: role
                    .role_type
                    .description
                    .clone()
                    .unwrap_or_else(|| role.role_type.code.clone()),
                role_group: group
                    .group_type
                    .description
                    .clone()
                    .unwrap_or_else(|| group.group_type.code.clone()),
                person_name: role.person.as_ref().map(person_name),
                birth_date: role.person.as_ref().and_then(|p| p.birth_date),
            })
        })
        .collect()
}

fn person_name(person: &RolePerson) -> String {
    match &person.last_name {
        Some(last) => format!("{} {last}", person.first_name),
        None => person.first_name.clone(),
    }
}
