pub mod error;
pub mod retry;
pub mod types;

pub use error::{RegistryError, Result};
pub use retry::RetryPolicy;
pub use types::{
    BranchRecord, CodeDescription, RegistryAddress, RegistryRecord, RoleEntry, RoleGroup,
    RolePerson,
};

use chrono::NaiveDate;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use types::{BranchListResponse, ChangesResponse, ListResponse, RelationsResponse};

/// Endpoint data for one national registry. The client is the same for every
/// country; only this table differs.
#[derive(Debug, Clone)]
pub struct RegistrySpec {
    pub country: &'static str,
    pub base_url: String,
    /// Main-register listing; also the prefix for single-record fetches.
    pub entity_path: &'static str,
    /// Branch (secondary location) listing.
    pub branch_path: &'static str,
    /// Change feed for the main register.
    pub changes_path: &'static str,
    /// Sub-resource segment for decision-maker relations under an entity.
    pub relations_segment: &'static str,
}

impl RegistrySpec {
    /// The Norwegian reference registry.
    pub fn norway(base_url: impl Into<String>) -> Self {
        Self {
            country: "NO",
            base_url: base_url.into(),
            entity_path: "/enhetsregisteret/api/enheter",
            branch_path: "/enhetsregisteret/api/underenheter",
            changes_path: "/enhetsregisteret/api/oppdateringer/enheter",
            relations_segment: "roller",
        }
    }

    pub fn sweden(base_url: impl Into<String>) -> Self {
        Self {
            country: "SE",
            base_url: base_url.into(),
            entity_path: "/foretagsregister/v1/organisationer",
            branch_path: "/foretagsregister/v1/arbetsstallen",
            changes_path: "/foretagsregister/v1/uppdateringar",
            relations_segment: "befattningshavare",
        }
    }

    pub fn denmark(base_url: impl Into<String>) -> Self {
        Self {
            country: "DK",
            base_url: base_url.into(),
            entity_path: "/virksomheder",
            branch_path: "/produktionsenheder",
            changes_path: "/opdateringer",
            relations_segment: "deltagere",
        }
    }

    pub fn finland(base_url: impl Into<String>) -> Self {
        Self {
            country: "FI",
            base_url: base_url.into(),
            entity_path: "/companies",
            branch_path: "/auxiliary-locations",
            changes_path: "/updated-companies",
            relations_segment: "roles",
        }
    }
}

/// Optional filters for the main listing.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub name: Option<String>,
    pub organization_form: Option<String>,
    pub industry_code: Option<String>,
    pub municipality_number: Option<String>,
}

impl ListFilters {
    fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if let Some(name) = &self.name {
            pairs.append_pair("name", name);
        }
        if let Some(form) = &self.organization_form {
            pairs.append_pair("organizationForm", form);
        }
        if let Some(code) = &self.industry_code {
            pairs.append_pair("industryCode", code);
        }
        if let Some(number) = &self.municipality_number {
            pairs.append_pair("municipalityNumber", number);
        }
    }
}

/// Resilient access to one national business registry. Every request carries
/// the configured identifying header; transient upstream failures (5xx, 429,
/// network, undecodable body) are retried with exponential backoff, permanent
/// 4xx failures are returned immediately.
pub struct RegistryClient {
    http: reqwest::Client,
    spec: RegistrySpec,
    policy: RetryPolicy,
    user_agent: String,
}

impl RegistryClient {
    pub fn new(spec: RegistrySpec, user_agent: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            spec,
            policy: RetryPolicy::default(),
            user_agent: user_agent.into(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn country(&self) -> &'static str {
        self.spec.country
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.spec.base_url, path))
            .map_err(|e| RegistryError::Client {
                status: 0,
                message: format!("invalid registry URL: {e}"),
            })
    }

    /// GET `url`, classify the status, decode the body. One attempt; the
    /// retry loop wraps this.
    async fn get_once<T: DeserializeOwned>(&self, url: &Url, subject: Option<&str>) -> Result<T> {
        let resp = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RegistryError::from_status(status.as_u16(), message, subject));
        }

        resp.json::<T>()
            .await
            .map_err(|e| RegistryError::InvalidBody(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, subject: Option<&str>) -> Result<T> {
        debug!(country = self.spec.country, url = %url, "Registry request");
        retry::with_retries(&self.policy, url.as_str(), || {
            self.get_once(&url, subject)
        })
        .await
    }

    /// One page of the main listing. Returns the records and whether the
    /// registry advertises a further page.
    pub async fn fetch_page(
        &self,
        page: u32,
        size: u32,
        filters: &ListFilters,
    ) -> Result<(Vec<RegistryRecord>, bool)> {
        let mut url = self.endpoint(self.spec.entity_path)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());
        filters.apply(&mut url);

        let resp: ListResponse = self.get_json(url, None).await?;
        let has_next = resp.next_page_link.is_some();
        Ok((resp.records, has_next))
    }

    /// Single record by organization number. `NotFound` on 404.
    pub async fn fetch_by_id(&self, orgnr: &str) -> Result<RegistryRecord> {
        let url = self.endpoint(&format!("{}/{orgnr}", self.spec.entity_path))?;
        self.get_json(url, Some(orgnr)).await
    }

    /// One page of organization numbers changed since `since` (inclusive,
    /// date granularity — the registry's change feed does not expose a finer
    /// clock).
    pub async fn fetch_changes_since(
        &self,
        since: NaiveDate,
        page: u32,
        size: u32,
    ) -> Result<(Vec<String>, bool)> {
        let mut url = self.endpoint(self.spec.changes_path)?;
        url.query_pairs_mut()
            .append_pair("since", &since.format("%Y-%m-%d").to_string())
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());

        let resp: ChangesResponse = self.get_json(url, None).await?;
        let has_next = resp.next_page_link.is_some();
        Ok((resp.changed_ids, has_next))
    }

    /// Decision-maker role groups for one entity.
    pub async fn fetch_relations(&self, orgnr: &str) -> Result<Vec<RoleGroup>> {
        let url = self.endpoint(&format!(
            "{}/{orgnr}/{}",
            self.spec.entity_path, self.spec.relations_segment
        ))?;
        let resp: RelationsResponse = self.get_json(url, Some(orgnr)).await?;
        Ok(resp.role_groups)
    }

    /// One page of the branch listing.
    pub async fn fetch_branch_page(
        &self,
        page: u32,
        size: u32,
    ) -> Result<(Vec<BranchRecord>, bool)> {
        let mut url = self.endpoint(self.spec.branch_path)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());

        let resp: BranchListResponse = self.get_json(url, None).await?;
        let has_next = resp.next_page_link.is_some();
        Ok((resp.records, has_next))
    }
}
