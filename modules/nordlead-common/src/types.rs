use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Inactive,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EntityStatus::Active),
            "inactive" => Ok(EntityStatus::Inactive),
            other => Err(format!("unknown entity status: {other}")),
        }
    }
}

/// The four run variants. The serialized spellings are a stable interface
/// consumed by status reporting — do not rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Full,
    Incremental,
    Roles,
    Subentities,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Full => "full",
            JobType::Incremental => "incremental",
            JobType::Roles => "roles",
            JobType::Subentities => "subentities",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(JobType::Full),
            "incremental" => Ok(JobType::Incremental),
            "roles" => Ok(JobType::Roles),
            "subentities" => Ok(JobType::Subentities),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

/// Job lifecycle. A job is created `running` and transitions exactly once to
/// `completed` or `failed`; it is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

// --- Entities ---

/// One registered organization as last seen in the upstream registry.
/// `orgnr` is the registry's organization number: globally unique, immutable,
/// and the only upsert key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub id: Uuid,
    pub orgnr: String,
    pub name: String,
    pub status: EntityStatus,
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

/// Mapper output: the fields a registry record contributes to a snapshot.
/// Scores, role flag and timestamps are owned by the store and the scoring
/// pass, not the mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub orgnr: String,
    pub name: String,
    pub status: EntityStatus,
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
    pub source_updated_at: Option<DateTime<Utc>>,
}

/// Branch / secondary location owned by a parent snapshot via its orgnr.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEntity {
    pub id: Uuid,
    pub orgnr: String,
    pub parent_orgnr: String,
    pub name: String,
    pub industry_code: Option<String>,
    pub address: Option<String>,
    pub municipality: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubEntity {
    pub orgnr: String,
    pub parent_orgnr: String,
    pub name: String,
    pub industry_code: Option<String>,
    pub address: Option<String>,
    pub municipality: Option<String>,
}

/// Decision-maker role attached to an entity, from the registry's relations
/// sub-resource. The full set for an entity is replaced in one transaction
/// whenever roles are re-synced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRole {
    pub id: Uuid,
    pub orgnr: String,
    pub role_type: String,
    pub role_group: String,
    pub person_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub role_type: String,
    pub role_group: String,
    pub person_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

// --- Jobs ---

/// One ingestion run. Created and mutated only by the orchestrator.
/// The serialized field names are a stable interface (see module docs on
/// `JobType`) — status reporters parse them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed_count: i32,
    pub error_count: i32,
    pub log: Option<String>,
}
