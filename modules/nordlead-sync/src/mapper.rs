//! Registry record → snapshot mapping. Pure: no I/O, no clock.

use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;

use nordlead_common::{EntityStatus, NewSnapshot, NewSubEntity};
use registry_client::{BranchRecord, RegistryAddress, RegistryRecord};

#[derive(Debug, Error)]
pub enum MapError {
    #[error("record has no organization number")]
    MissingOrgnr,

    #[error("record {0} has no name")]
    MissingName(String),
}

/// Map a main-register record into the snapshot fields it owns.
/// Closure/liquidation/bankruptcy flags force `inactive` regardless of
/// anything else the record says.
pub fn map_record(record: &RegistryRecord) -> Result<NewSnapshot, MapError> {
    let orgnr = non_empty(record.organization_number.as_deref()).ok_or(MapError::MissingOrgnr)?;
    let name = non_empty(record.name.as_deref())
        .ok_or_else(|| MapError::MissingName(orgnr.clone()))?;

    let status = if record.bankrupt || record.under_liquidation || record.under_forced_liquidation
    {
        EntityStatus::Inactive
    } else {
        EntityStatus::Active
    };

    let address = record
        .business_address
        .as_ref()
        .or(record.location_address.as_ref());

    Ok(NewSnapshot {
        orgnr,
        name,
        status,
        organization_form_code: record.organization_form.as_ref().map(|f| f.code.clone()),
        organization_form_name: record
            .organization_form
            .as_ref()
            .and_then(|f| f.description.clone()),
        founded_date: record.founded_date,
        municipality: address.and_then(|a| a.municipality.clone()),
        municipality_number: address.and_then(|a| a.municipality_number.clone()),
        county: address
            .and_then(|a| a.municipality_number.as_deref())
            .and_then(county_for),
        postal_code: address.and_then(|a| a.postal_code.clone()),
        address: address.map(joined_address),
        industry_code: record.industry_code.as_ref().map(|c| c.code.clone()),
        industry_description: record
            .industry_code
            .as_ref()
            .and_then(|c| c.description.clone()),
        employee_count: record.employee_count,
        phone: record.phone.clone(),
        website: record.website.clone(),
        email: record.email.clone(),
        logo_url: None,
        source_updated_at: record.registered_at.map(start_of_day),
    })
}

/// A branch record mapped but not yet bound to a parent. The orchestrator
/// decides whether the parent exists locally; a branch without one is
/// dropped, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedBranch {
    pub orgnr: String,
    pub name: String,
    pub parent_orgnr: Option<String>,
    pub industry_code: Option<String>,
    pub address: Option<String>,
    pub municipality: Option<String>,
}

impl MappedBranch {
    pub fn into_sub_entity(self, parent_orgnr: String) -> NewSubEntity {
        NewSubEntity {
            orgnr: self.orgnr,
            parent_orgnr,
            name: self.name,
            industry_code: self.industry_code,
            address: self.address,
            municipality: self.municipality,
        }
    }
}

pub fn map_branch(record: &BranchRecord) -> Result<MappedBranch, MapError> {
    let orgnr = non_empty(record.organization_number.as_deref()).ok_or(MapError::MissingOrgnr)?;
    let name = non_empty(record.name.as_deref())
        .ok_or_else(|| MapError::MissingName(orgnr.clone()))?;
    let address = record.location_address.as_ref();

    Ok(MappedBranch {
        orgnr,
        name,
        parent_orgnr: non_empty(record.parent_organization_number.as_deref()),
        industry_code: record.industry_code.as_ref().map(|c| c.code.clone()),
        address: address.map(joined_address),
        municipality: address.and_then(|a| a.municipality.clone()),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn joined_address(address: &RegistryAddress) -> String {
    address.address_lines.join(", ")
}

fn start_of_day(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// County from the first two digits of the municipality number. Unmapped
/// prefixes yield no county, not an error.
pub fn county_for(municipality_number: &str) -> Option<String> {
    let prefix = municipality_number.get(0..2)?;
    let county = match prefix {
        "03" => "Oslo",
        "11" => "Rogaland",
        "15" => "Møre og Romsdal",
        "18" => "Nordland",
        "31" => "Østfold",
        "32" => "Akershus",
        "33" => "Buskerud",
        "34" => "Innlandet",
        "38" => "Vestfold og Telemark",
        "42" => "Agder",
        "46" => "Vestland",
        "50" => "Trøndelag",
        "54" => "Troms og Finnmark",
        _ => return None,
    };
    Some(county.to_string())
}

/// Industry vertical from the first two digits of the industry code. Codes
/// outside the table have no vertical.
pub fn industry_vertical(industry_code: &str) -> Option<&'static str> {
    let prefix = industry_code.get(0..2)?;
    let vertical = match prefix {
        "10" => "Manufacturing - Food",
        "25" => "Manufacturing - Metal",
        "41" | "42" | "43" => "Construction",
        "45" => "Retail - Automotive",
        "46" => "Wholesale Trade",
        "47" => "Retail Trade",
        "49" | "50" | "51" => "Transportation",
        "52" => "Warehousing",
        "55" => "Accommodation",
        "56" => "Food Services",
        "62" => "IT Services",
        "68" => "Real Estate",
        "69" => "Legal & Accounting",
        "70" => "Management Consulting",
        "71" => "Architecture & Engineering",
        "81" => "Facility Services",
        "86" => "Healthcare",
        "87" => "Social Services",
        _ => return None,
    };
    Some(vertical)
}

/// Legal-entity codes treated as eligible commercial targets.
pub fn is_commercial_form(org_form_code: &str) -> bool {
    matches!(
        org_form_code,
        "AS" | "ASA" | "ENK" | "ANS" | "DA" | "FLI" | "NUF"
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use registry_client::CodeDescription;

    fn record(orgnr: &str, name: &str) -> RegistryRecord {
        RegistryRecord {
            organization_number: Some(orgnr.to_string()),
            name: Some(name.to_string()),
            organization_form: None,
            industry_code: None,
            employee_count: None,
            business_address: None,
            location_address: None,
            founded_date: None,
            registered_at: None,
            bankrupt: false,
            under_liquidation: false,
            under_forced_liquidation: false,
            website: None,
            phone: None,
            email: None,
        }
    }

    #[test]
    fn healthy_record_maps_to_active() {
        let snapshot = map_record(&record("918654321", "Fjord Logistikk AS")).unwrap();
        assert_eq!(snapshot.status, EntityStatus::Active);
        assert_eq!(snapshot.orgnr, "918654321");
    }

    #[test]
    fn closure_flags_force_inactive() {
        let mut bankrupt = record("1", "A");
        bankrupt.bankrupt = true;
        assert_eq!(map_record(&bankrupt).unwrap().status, EntityStatus::Inactive);

        let mut liquidating = record("2", "B");
        liquidating.under_liquidation = true;
        assert_eq!(
            map_record(&liquidating).unwrap().status,
            EntityStatus::Inactive
        );

        let mut forced = record("3", "C");
        forced.under_forced_liquidation = true;
        assert_eq!(map_record(&forced).unwrap().status, EntityStatus::Inactive);
    }

    #[test]
    fn business_address_preferred_over_location() {
        let mut r = record("918654321", "Fjord Logistikk AS");
        r.business_address = Some(RegistryAddress {
            municipality: Some("Oslo".into()),
            municipality_number: Some("0301".into()),
            postal_code: Some("0150".into()),
            address_lines: vec!["Storgata 1".into(), "Oppgang B".into()],
            country: None,
        });
        r.location_address = Some(RegistryAddress {
            municipality: Some("Bergen".into()),
            ..Default::default()
        });

        let snapshot = map_record(&r).unwrap();
        assert_eq!(snapshot.municipality.as_deref(), Some("Oslo"));
        assert_eq!(snapshot.county.as_deref(), Some("Oslo"));
        assert_eq!(snapshot.address.as_deref(), Some("Storgata 1, Oppgang B"));
    }

    #[test]
    fn unmapped_municipality_prefix_has_no_county() {
        assert_eq!(county_for("9901"), None);
        assert_eq!(county_for("1103").as_deref(), Some("Rogaland"));
        assert_eq!(county_for(""), None);
    }

    #[test]
    fn missing_identity_is_an_error() {
        let mut r = record("", "Nameless");
        r.organization_number = Some("  ".into());
        assert!(matches!(map_record(&r), Err(MapError::MissingOrgnr)));

        let r = RegistryRecord {
            name: None,
            ..record("918654321", "x")
        };
        assert!(matches!(map_record(&r), Err(MapError::MissingName(_))));
    }

    #[test]
    fn registered_date_becomes_source_updated_at() {
        let mut r = record("918654321", "Fjord Logistikk AS");
        r.registered_at = NaiveDate::from_ymd_opt(2024, 3, 1);
        let snapshot = map_record(&r).unwrap();
        assert_eq!(
            snapshot.source_updated_at.unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
    }

    #[test]
    fn vertical_lookup_covers_construction_range() {
        assert_eq!(industry_vertical("41.20"), Some("Construction"));
        assert_eq!(industry_vertical("43.99"), Some("Construction"));
        assert_eq!(industry_vertical("52.10"), Some("Warehousing"));
        assert_eq!(industry_vertical("99.99"), None);
        assert_eq!(industry_vertical(""), None);
    }

    #[test]
    fn commercial_forms() {
        assert!(is_commercial_form("AS"));
        assert!(is_commercial_form("NUF"));
        assert!(!is_commercial_form("STI"));
    }

    #[test]
    fn branch_without_parent_maps_with_none() {
        let branch = BranchRecord {
            organization_number: Some("999888777".into()),
            name: Some("Fjord Logistikk avd Bergen".into()),
            parent_organization_number: None,
            industry_code: Some(CodeDescription {
                code: "52.10".into(),
                description: None,
            }),
            location_address: None,
        };
        let mapped = map_branch(&branch).unwrap();
        assert_eq!(mapped.parent_orgnr, None);
        assert_eq!(mapped.industry_code.as_deref(), Some("52.10"));
    }
}
