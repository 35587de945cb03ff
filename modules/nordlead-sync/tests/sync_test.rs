//! Orchestrator flow tests: scripted registry, in-memory stores.
//! No network, no database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use nordlead_common::{
    EntitySnapshot, EntityStatus, JobStatus, JobType, NewRole, NewSnapshot, NewSubEntity,
    ScoringResult, SyncJob,
};
use nordlead_sync::sync::{SyncOptions, SyncOrchestrator};
use nordlead_sync::traits::{EntityStore, JobStore, Registry};
use registry_client::{
    BranchRecord, CodeDescription, ListFilters, RegistryError, RegistryRecord, RoleEntry,
    RoleGroup, RolePerson,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn record(orgnr: &str, name: &str) -> RegistryRecord {
    RegistryRecord {
        organization_number: Some(orgnr.to_string()),
        name: Some(name.to_string()),
        organization_form: Some(CodeDescription {
            code: "AS".into(),
            description: Some("Aksjeselskap".into()),
        }),
        industry_code: Some(CodeDescription {
            code: "52.10".into(),
            description: Some("Warehousing".into()),
        }),
        employee_count: Some(42),
        business_address: None,
        location_address: None,
        founded_date: None,
        registered_at: Some(Utc::now().date_naive()),
        bankrupt: false,
        under_liquidation: false,
        under_forced_liquidation: false,
        website: Some("https://example.no".into()),
        phone: Some("+47 22 12 34 56".into()),
        email: None,
    }
}

fn branch(orgnr: &str, parent: Option<&str>) -> BranchRecord {
    BranchRecord {
        organization_number: Some(orgnr.to_string()),
        name: Some(format!("Branch {orgnr}")),
        parent_organization_number: parent.map(str::to_string),
        industry_code: None,
        location_address: None,
    }
}

// ---------------------------------------------------------------------------
// MockRegistry — scripted upstream
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockRegistry {
    pages: Vec<Vec<RegistryRecord>>,
    /// Page index whose fetch always fails transiently (post-retry).
    failing_page: Option<u32>,
    records_by_id: HashMap<String, RegistryRecord>,
    changes_pages: Vec<Vec<String>>,
    relations: HashMap<String, Vec<RoleGroup>>,
    branch_pages: Vec<Vec<BranchRecord>>,
    page_calls: AtomicU32,
    seen_since: Mutex<Option<NaiveDate>>,
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_page(
        &self,
        page: u32,
        _size: u32,
        _filters: &ListFilters,
    ) -> registry_client::Result<(Vec<RegistryRecord>, bool)> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_page == Some(page) {
            return Err(RegistryError::Transient {
                status: 500,
                message: "upstream down".into(),
            });
        }
        let records = self.pages.get(page as usize).cloned().unwrap_or_default();
        let has_next = (page as usize + 1) < self.pages.len();
        Ok((records, has_next))
    }

    async fn fetch_by_id(&self, orgnr: &str) -> registry_client::Result<RegistryRecord> {
        self.records_by_id
            .get(orgnr)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(orgnr.to_string()))
    }

    async fn fetch_changes_since(
        &self,
        since: NaiveDate,
        page: u32,
        _size: u32,
    ) -> registry_client::Result<(Vec<String>, bool)> {
        *self.seen_since.lock().unwrap() = Some(since);
        let ids = self
            .changes_pages
            .get(page as usize)
            .cloned()
            .unwrap_or_default();
        let has_next = (page as usize + 1) < self.changes_pages.len();
        Ok((ids, has_next))
    }

    async fn fetch_relations(&self, orgnr: &str) -> registry_client::Result<Vec<RoleGroup>> {
        Ok(self.relations.get(orgnr).cloned().unwrap_or_default())
    }

    async fn fetch_branch_page(
        &self,
        page: u32,
        _size: u32,
    ) -> registry_client::Result<(Vec<BranchRecord>, bool)> {
        let records = self
            .branch_pages
            .get(page as usize)
            .cloned()
            .unwrap_or_default();
        let has_next = (page as usize + 1) < self.branch_pages.len();
        Ok((records, has_next))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore / MemoryJobs — hashmap-backed persistence
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    companies: Mutex<HashMap<String, EntitySnapshot>>,
    explanations: Mutex<HashMap<String, ScoringResult>>,
    sub_entities: Mutex<HashMap<String, NewSubEntity>>,
    roles: Mutex<HashMap<String, Vec<NewRole>>>,
}

impl MemoryStore {
    fn company(&self, orgnr: &str) -> EntitySnapshot {
        self.companies
            .lock()
            .unwrap()
            .get(orgnr)
            .cloned()
            .expect("company not stored")
    }

    fn company_count(&self) -> usize {
        self.companies.lock().unwrap().len()
    }

    fn explanation(&self, orgnr: &str) -> ScoringResult {
        self.explanations
            .lock()
            .unwrap()
            .get(orgnr)
            .cloned()
            .expect("no explanations stored")
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn upsert_snapshot(
        &self,
        snapshot: &NewSnapshot,
        seen_at: DateTime<Utc>,
    ) -> anyhow::Result<EntitySnapshot> {
        let mut companies = self.companies.lock().unwrap();
        let entry = companies
            .entry(snapshot.orgnr.clone())
            .and_modify(|existing| {
                existing.name = snapshot.name.clone();
                existing.status = snapshot.status;
                existing.organization_form_code = snapshot.organization_form_code.clone();
                existing.organization_form_name = snapshot.organization_form_name.clone();
                existing.industry_code = snapshot.industry_code.clone();
                existing.industry_description = snapshot.industry_description.clone();
                existing.employee_count = snapshot.employee_count;
                existing.phone = snapshot.phone.clone();
                existing.website = snapshot.website.clone();
                existing.email = snapshot.email.clone();
                existing.source_updated_at = snapshot.source_updated_at;
                existing.last_seen_at = existing.last_seen_at.max(seen_at);
                existing.updated_at = seen_at;
            })
            .or_insert_with(|| EntitySnapshot {
                id: Uuid::new_v4(),
                orgnr: snapshot.orgnr.clone(),
                name: snapshot.name.clone(),
                status: snapshot.status,
                organization_form_code: snapshot.organization_form_code.clone(),
                organization_form_name: snapshot.organization_form_name.clone(),
                founded_date: snapshot.founded_date,
                municipality: snapshot.municipality.clone(),
                municipality_number: snapshot.municipality_number.clone(),
                county: snapshot.county.clone(),
                postal_code: snapshot.postal_code.clone(),
                address: snapshot.address.clone(),
                industry_code: snapshot.industry_code.clone(),
                industry_description: snapshot.industry_description.clone(),
                employee_count: snapshot.employee_count,
                phone: snapshot.phone.clone(),
                website: snapshot.website.clone(),
                email: snapshot.email.clone(),
                logo_url: snapshot.logo_url.clone(),
                role_data_loaded: false,
                ai_summary: None,
                overall_score: 0,
                use_case_fit: 0,
                urgency_score: 0,
                data_quality_score: 0,
                last_seen_at: seen_at,
                source_updated_at: snapshot.source_updated_at,
                created_at: seen_at,
                updated_at: seen_at,
            });
        Ok(entry.clone())
    }

    async fn get_by_orgnr(&self, orgnr: &str) -> anyhow::Result<Option<EntitySnapshot>> {
        Ok(self.companies.lock().unwrap().get(orgnr).cloned())
    }

    async fn sub_entity_count(&self, orgnr: &str) -> anyhow::Result<i64> {
        Ok(self
            .sub_entities
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.parent_orgnr == orgnr)
            .count() as i64)
    }

    async fn apply_scores(&self, orgnr: &str, result: &ScoringResult) -> anyhow::Result<()> {
        let mut companies = self.companies.lock().unwrap();
        let company = companies
            .get_mut(orgnr)
            .ok_or_else(|| anyhow::anyhow!("unknown company {orgnr}"))?;
        company.overall_score = result.overall;
        company.use_case_fit = result.use_case_fit;
        company.urgency_score = result.urgency;
        company.data_quality_score = result.data_quality;
        self.explanations
            .lock()
            .unwrap()
            .insert(orgnr.to_string(), result.clone());
        Ok(())
    }

    async fn parent_exists(&self, parent_orgnr: &str) -> anyhow::Result<bool> {
        Ok(self.companies.lock().unwrap().contains_key(parent_orgnr))
    }

    async fn upsert_sub_entity(&self, branch: &NewSubEntity) -> anyhow::Result<()> {
        self.sub_entities
            .lock()
            .unwrap()
            .insert(branch.orgnr.clone(), branch.clone());
        Ok(())
    }

    async fn roles_backlog(&self, limit: i64) -> anyhow::Result<Vec<String>> {
        let companies = self.companies.lock().unwrap();
        let mut backlog: Vec<String> = companies
            .values()
            .filter(|c| c.status == EntityStatus::Active && !c.role_data_loaded)
            .map(|c| c.orgnr.clone())
            .collect();
        backlog.sort();
        backlog.truncate(limit as usize);
        Ok(backlog)
    }

    async fn replace_roles(&self, orgnr: &str, roles: &[NewRole]) -> anyhow::Result<()> {
        self.roles
            .lock()
            .unwrap()
            .insert(orgnr.to_string(), roles.to_vec());
        if let Some(company) = self.companies.lock().unwrap().get_mut(orgnr) {
            company.role_data_loaded = true;
        }
        Ok(())
    }

    async fn set_summary(&self, orgnr: &str, summary: &str) -> anyhow::Result<()> {
        if let Some(company) = self.companies.lock().unwrap().get_mut(orgnr) {
            company.ai_summary = Some(summary.to_string());
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryJobs {
    jobs: Mutex<Vec<SyncJob>>,
}

impl MemoryJobs {
    fn seed_completed(&self, job_type: JobType, finished_at: DateTime<Utc>) {
        self.jobs.lock().unwrap().push(SyncJob {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Completed,
            started_at: finished_at - Duration::minutes(5),
            finished_at: Some(finished_at),
            processed_count: 0,
            error_count: 0,
            log: None,
        });
    }

    fn latest(&self) -> SyncJob {
        self.jobs.lock().unwrap().last().cloned().expect("no jobs")
    }
}

#[async_trait]
impl JobStore for MemoryJobs {
    async fn create(&self, job_type: JobType) -> anyhow::Result<SyncJob> {
        let job = SyncJob {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            processed_count: 0,
            error_count: 0,
            log: None,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> anyhow::Result<()> {
        self.finish(id, JobStatus::Completed, processed, errors, log)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> anyhow::Result<()> {
        self.finish(id, JobStatus::Failed, processed, errors, log)
    }

    async fn last_completed_finished_at(
        &self,
        job_type: JobType,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.job_type == job_type && j.status == JobStatus::Completed)
            .filter_map(|j| j.finished_at)
            .max())
    }
}

impl MemoryJobs {
    fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        processed: i32,
        errors: i32,
        log: &str,
    ) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| anyhow::anyhow!("unknown job {id}"))?;
        anyhow::ensure!(job.status == JobStatus::Running, "job {id} is not running");
        job.status = status;
        job.finished_at = Some(Utc::now());
        job.processed_count = processed;
        job.error_count = errors;
        job.log = Some(log.to_string());
        Ok(())
    }
}

fn orchestrator(
    registry: MockRegistry,
) -> (Arc<MemoryStore>, Arc<MemoryJobs>, SyncOrchestrator) {
    let store = Arc::new(MemoryStore::default());
    let jobs = Arc::new(MemoryJobs::default());
    let orch = SyncOrchestrator::new(
        Arc::new(registry),
        store.clone(),
        jobs.clone(),
        SyncOptions {
            concurrency: 4,
            ..SyncOptions::default()
        },
    );
    (store, jobs, orch)
}

// ---------------------------------------------------------------------------
// Full sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_sync_ingests_scores_and_completes_job() {
    let registry = MockRegistry {
        pages: vec![
            vec![record("100000001", "Alpha AS"), record("100000002", "Beta AS")],
            vec![record("100000003", "Gamma AS")],
        ],
        ..Default::default()
    };
    let (store, jobs, orch) = orchestrator(registry);

    let report = orch.run_full().await.unwrap();
    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.errors, 0);
    assert_eq!(report.stats.pages, 2);

    let alpha = store.company("100000001");
    assert!(alpha.overall_score > 0);
    let explanation = store.explanation("100000001");
    assert_eq!(explanation.signals.len(), 9);

    let job = jobs.latest();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.processed_count, 3);
    assert_eq!(job.error_count, 0);
    assert!(job.finished_at.is_some());
}

#[tokio::test]
async fn full_sync_twice_is_idempotent() {
    let pages = vec![vec![
        record("100000001", "Alpha AS"),
        record("100000002", "Beta AS"),
    ]];
    let registry = MockRegistry {
        pages: pages.clone(),
        ..Default::default()
    };
    let (store, _jobs, orch) = orchestrator(registry);

    orch.run_full().await.unwrap();
    let first = store.company("100000001");
    let first_explanation = store.explanation("100000001");

    orch.run_full().await.unwrap();
    let second = store.company("100000001");
    let second_explanation = store.explanation("100000001");

    assert_eq!(store.company_count(), 2);
    assert_eq!(first.id, second.id);
    assert_eq!(first.overall_score, second.overall_score);
    assert_eq!(first_explanation.signals, second_explanation.signals);
    assert!(second.last_seen_at >= first.last_seen_at);
}

#[tokio::test]
async fn record_failure_is_counted_not_fatal() {
    let nameless = RegistryRecord {
        name: None,
        ..record("100000009", "x")
    };
    let registry = MockRegistry {
        pages: vec![vec![record("100000001", "Alpha AS"), nameless]],
        ..Default::default()
    };
    let (store, jobs, orch) = orchestrator(registry);

    let report = orch.run_full().await.unwrap();
    assert_eq!(report.stats.processed, 1);
    assert_eq!(report.stats.errors, 1);
    assert_eq!(store.company_count(), 1);
    assert_eq!(jobs.latest().status, JobStatus::Completed);
}

#[tokio::test]
async fn page_failure_fails_job_and_preserves_counters() {
    let registry = Arc::new(MockRegistry {
        pages: vec![
            vec![record("100000001", "Alpha AS"), record("100000002", "Beta AS")],
            vec![record("100000003", "Gamma AS")],
        ],
        failing_page: Some(1),
        ..Default::default()
    });
    let store = Arc::new(MemoryStore::default());
    let jobs = Arc::new(MemoryJobs::default());
    let orch = SyncOrchestrator::new(
        registry.clone(),
        store.clone(),
        jobs.clone(),
        SyncOptions::default(),
    );

    let result = orch.run_full().await;
    assert!(result.is_err());

    // Pages are strictly ordered: the loop stopped at the failing page and
    // never requested anything past it.
    assert_eq!(registry.page_calls.load(Ordering::SeqCst), 2);

    let job = jobs.latest();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.processed_count, 2);
    assert_eq!(job.error_count, 0);
    assert!(job.log.as_deref().unwrap_or_default().starts_with("Failed:"));
    assert_eq!(store.company_count(), 2);
}

// ---------------------------------------------------------------------------
// Incremental sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incremental_checkpoint_date_reaches_the_registry() {
    let checkpoint = Utc::now() - Duration::days(3);
    let registry = Arc::new(MockRegistry {
        changes_pages: vec![vec!["100000001".to_string()]],
        records_by_id: HashMap::from([(
            "100000001".to_string(),
            record("100000001", "Alpha AS"),
        )]),
        ..Default::default()
    });
    let store = Arc::new(MemoryStore::default());
    let jobs = Arc::new(MemoryJobs::default());
    jobs.seed_completed(JobType::Incremental, checkpoint);
    let orch = SyncOrchestrator::new(
        registry.clone(),
        store,
        jobs,
        SyncOptions::default(),
    );

    orch.run_incremental().await.unwrap();
    assert_eq!(
        *registry.seen_since.lock().unwrap(),
        Some(checkpoint.date_naive())
    );
}

#[tokio::test]
async fn incremental_without_checkpoint_falls_back_one_day() {
    let registry = Arc::new(MockRegistry {
        changes_pages: vec![vec![]],
        ..Default::default()
    });
    let store = Arc::new(MemoryStore::default());
    let jobs = Arc::new(MemoryJobs::default());
    let orch = SyncOrchestrator::new(
        registry.clone(),
        store,
        jobs,
        SyncOptions::default(),
    );

    orch.run_incremental().await.unwrap();

    let seen = registry.seen_since.lock().unwrap().expect("no since seen");
    let lower = (Utc::now() - Duration::days(2)).date_naive();
    let upper = Utc::now().date_naive();
    assert!(seen >= lower && seen < upper, "since {seen} outside lookback window");
}

#[tokio::test]
async fn incremental_missing_record_counts_as_error() {
    let registry = MockRegistry {
        changes_pages: vec![vec!["100000001".to_string(), "999999999".to_string()]],
        records_by_id: HashMap::from([(
            "100000001".to_string(),
            record("100000001", "Alpha AS"),
        )]),
        ..Default::default()
    };
    let (_store, jobs, orch) = orchestrator(registry);

    let report = orch.run_incremental().await.unwrap();
    assert_eq!(report.stats.processed, 1);
    assert_eq!(report.stats.errors, 1);
    assert_eq!(jobs.latest().status, JobStatus::Completed);
}

// ---------------------------------------------------------------------------
// Roles sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn roles_sync_loads_roles_without_rescoring() {
    let registry = MockRegistry {
        pages: vec![vec![record("100000001", "Alpha AS")]],
        relations: HashMap::from([(
            "100000001".to_string(),
            vec![RoleGroup {
                group_type: CodeDescription {
                    code: "STYR".into(),
                    description: Some("Board".into()),
                },
                roles: vec![
                    RoleEntry {
                        role_type: CodeDescription {
                            code: "LEDE".into(),
                            description: Some("Chair".into()),
                        },
                        person: Some(RolePerson {
                            first_name: "Kari".into(),
                            last_name: Some("Nordmann".into()),
                            birth_date: None,
                        }),
                        resigned: false,
                    },
                    RoleEntry {
                        role_type: CodeDescription {
                            code: "MEDL".into(),
                            description: Some("Member".into()),
                        },
                        person: None,
                        resigned: true,
                    },
                ],
            }],
        )]),
        ..Default::default()
    };
    let (store, jobs, orch) = orchestrator(registry);

    orch.run_full().await.unwrap();
    let scored = store.company("100000001");
    assert!(!scored.role_data_loaded);

    let report = orch.run_roles().await.unwrap();
    assert_eq!(report.stats.processed, 1);

    let after = store.company("100000001");
    assert!(after.role_data_loaded);
    let roles = store.roles.lock().unwrap().get("100000001").cloned().unwrap();
    assert_eq!(roles.len(), 1, "resigned roles are dropped");

    // Deliberate asymmetry: the roles flow does not rescore, so the score
    // and its explanation still reflect role_data_loaded = false.
    assert_eq!(after.overall_score, scored.overall_score);
    let explanation = store.explanation("100000001");
    let roles_signal = explanation
        .signals
        .iter()
        .find(|s| s.signal == "has_roles_data")
        .unwrap();
    assert!(!roles_signal.active);

    assert_eq!(jobs.latest().status, JobStatus::Completed);
}

#[tokio::test]
async fn roles_backlog_skips_entities_already_loaded() {
    let registry = MockRegistry {
        pages: vec![vec![record("100000001", "Alpha AS")]],
        relations: HashMap::from([("100000001".to_string(), vec![])]),
        ..Default::default()
    };
    let (store, _jobs, orch) = orchestrator(registry);

    orch.run_full().await.unwrap();
    orch.run_roles().await.unwrap();
    assert!(store.company("100000001").role_data_loaded);

    // Second pass finds nothing to do.
    let report = orch.run_roles().await.unwrap();
    assert_eq!(report.stats.processed, 0);
    assert_eq!(report.stats.errors, 0);
}

// ---------------------------------------------------------------------------
// Sub-entity sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orphan_branches_are_dropped_not_errored() {
    let registry = MockRegistry {
        pages: vec![vec![record("100000001", "Alpha AS")]],
        branch_pages: vec![vec![
            branch("200000001", Some("100000001")),
            branch("200000002", Some("555555555")), // parent unknown locally
            branch("200000003", None),              // no parent at all
        ]],
        ..Default::default()
    };
    let (store, jobs, orch) = orchestrator(registry);

    orch.run_full().await.unwrap();
    let report = orch.run_sub_entities().await.unwrap();

    assert_eq!(report.stats.processed, 3);
    assert_eq!(report.stats.errors, 0);

    let branches = store.sub_entities.lock().unwrap();
    assert_eq!(branches.len(), 1);
    assert!(branches.contains_key("200000001"));

    let job = jobs.latest();
    assert_eq!(job.processed_count, 3);
    assert_eq!(job.error_count, 0);
}

#[tokio::test]
async fn branches_feed_the_next_scoring_pass() {
    let registry = MockRegistry {
        pages: vec![vec![record("100000001", "Alpha AS")]],
        branch_pages: vec![vec![branch("200000001", Some("100000001"))]],
        ..Default::default()
    };
    let (store, _jobs, orch) = orchestrator(registry);

    orch.run_full().await.unwrap();
    let before = store.company("100000001");

    orch.run_sub_entities().await.unwrap();
    orch.run_full().await.unwrap();
    let after = store.company("100000001");

    // The branch signal (weight 10) is now active.
    assert_eq!(after.overall_score, before.overall_score + 10);
}
