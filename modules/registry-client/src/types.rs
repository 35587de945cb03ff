use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAddress {
    pub municipality: Option<String>,
    pub municipality_number: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    pub country: Option<String>,
}

/// One main-register record as served by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub organization_number: Option<String>,
    pub name: Option<String>,
    pub organization_form: Option<CodeDescription>,
    pub industry_code: Option<CodeDescription>,
    pub employee_count: Option<i32>,
    pub business_address: Option<RegistryAddress>,
    pub location_address: Option<RegistryAddress>,
    pub founded_date: Option<NaiveDate>,
    /// Last registration date in the registry — the source-updated marker.
    pub registered_at: Option<NaiveDate>,
    #[serde(default)]
    pub bankrupt: bool,
    #[serde(default)]
    pub under_liquidation: bool,
    #[serde(default)]
    pub under_forced_liquidation: bool,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One branch (secondary location) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRecord {
    pub organization_number: Option<String>,
    pub name: Option<String>,
    pub parent_organization_number: Option<String>,
    pub industry_code: Option<CodeDescription>,
    pub location_address: Option<RegistryAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePerson {
    pub first_name: String,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    pub role_type: CodeDescription,
    pub person: Option<RolePerson>,
    #[serde(default)]
    pub resigned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGroup {
    pub group_type: CodeDescription,
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
}

// --- Response envelopes ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub size: Option<i64>,
    pub total_elements: Option<i64>,
    pub total_pages: Option<i64>,
    pub number: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub records: Vec<RegistryRecord>,
    pub next_page_link: Option<String>,
    pub page: Option<PageMeta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchListResponse {
    #[serde(default)]
    pub records: Vec<BranchRecord>,
    pub next_page_link: Option<String>,
    pub page: Option<PageMeta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesResponse {
    #[serde(default)]
    pub changed_ids: Vec<String>,
    pub next_page_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsResponse {
    #[serde(default)]
    pub role_groups: Vec<RoleGroup>,
}
