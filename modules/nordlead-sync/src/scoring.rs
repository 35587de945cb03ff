//! Weighted multi-signal lead scoring with explanations.
//!
//! Pure: the clock is an argument, so identical inputs always produce a
//! byte-identical result. Signal weights sum to 100.

use chrono::{DateTime, Utc};

use nordlead_common::{EntitySnapshot, EntityStatus, RelatedCounts, ScoreSignal, ScoringResult};

use crate::mapper::{industry_vertical, is_commercial_form};

/// Verticals judged to have high automation/sales potential.
const TARGET_VERTICALS: [&str; 11] = [
    "Manufacturing - Food",
    "Manufacturing - Metal",
    "Construction",
    "Wholesale Trade",
    "Retail Trade",
    "Transportation",
    "Warehousing",
    "Food Services",
    "Facility Services",
    "Real Estate",
    "Legal & Accounting",
];

/// Days since the last registry update within which an entity counts as
/// recently updated.
const RECENT_UPDATE_DAYS: i64 = 90;

/// Score one entity. `related` carries counts the snapshot doesn't hold.
pub fn score(
    snapshot: &EntitySnapshot,
    related: &RelatedCounts,
    now: DateTime<Utc>,
) -> ScoringResult {
    let mut signals: Vec<ScoreSignal> = Vec::with_capacity(9);

    let is_active = snapshot.status == EntityStatus::Active;
    signals.push(ScoreSignal {
        signal: "company_active".into(),
        weight: 20,
        reason: if is_active {
            "Actively operating".into()
        } else {
            "Registered as inactive".into()
        },
        active: is_active,
    });

    let employee_count = snapshot.employee_count.unwrap_or(0);
    let optimal_size = (5..=250).contains(&employee_count);
    signals.push(ScoreSignal {
        signal: "optimal_employee_count".into(),
        weight: 15,
        reason: if optimal_size {
            format!("{employee_count} employees - ideal SMB size")
        } else if employee_count > 250 {
            "Enterprise scale - likely needs a bespoke approach".into()
        } else {
            "Too small - limited budget".into()
        },
        active: optimal_size,
    });

    let vertical = snapshot.industry_code.as_deref().and_then(industry_vertical);
    let target_vertical = vertical.is_some_and(|v| TARGET_VERTICALS.contains(&v));
    signals.push(ScoreSignal {
        signal: "target_vertical".into(),
        weight: 20,
        reason: if target_vertical {
            format!("{} - high automation potential", vertical.unwrap_or_default())
        } else {
            format!("{} - not a primary target", vertical.unwrap_or("Unknown industry"))
        },
        active: target_vertical,
    });

    let branch_count = related.sub_entities;
    let has_branches = branch_count >= 1;
    signals.push(ScoreSignal {
        signal: "multiple_branches".into(),
        weight: 10,
        reason: if has_branches {
            format!("{branch_count} locations - coordination need")
        } else {
            "Single location".into()
        },
        active: has_branches,
    });

    let has_website = snapshot.website.is_some();
    signals.push(ScoreSignal {
        signal: "has_website".into(),
        weight: 8,
        reason: if has_website {
            "Web presence established".into()
        } else {
            "No website - digital maturity unclear".into()
        },
        active: has_website,
    });

    let has_phone = snapshot.phone.is_some();
    signals.push(ScoreSignal {
        signal: "has_contact_phone".into(),
        weight: 8,
        reason: if has_phone {
            "Contact phone available".into()
        } else {
            "No phone - harder to reach".into()
        },
        active: has_phone,
    });

    let days_since_update = snapshot
        .source_updated_at
        .map(|ts| (now - ts).num_days())
        .unwrap_or(i64::MAX);
    let recently_updated = days_since_update <= RECENT_UPDATE_DAYS;
    signals.push(ScoreSignal {
        signal: "recently_updated".into(),
        weight: 8,
        reason: if recently_updated {
            format!("Updated {days_since_update} days ago - active changes")
        } else {
            "No recent registry updates".into()
        },
        active: recently_updated,
    });

    let commercial = snapshot
        .organization_form_code
        .as_deref()
        .is_some_and(is_commercial_form);
    signals.push(ScoreSignal {
        signal: "commercial_org_form".into(),
        weight: 6,
        reason: if commercial {
            format!(
                "{} - commercial entity",
                snapshot.organization_form_code.as_deref().unwrap_or_default()
            )
        } else {
            "Non-commercial or unknown form".into()
        },
        active: commercial,
    });

    let roles_loaded = snapshot.role_data_loaded;
    signals.push(ScoreSignal {
        signal: "has_roles_data".into(),
        weight: 5,
        reason: if roles_loaded {
            "Decision makers identified".into()
        } else {
            "No role data loaded".into()
        },
        active: roles_loaded,
    });

    let total: i32 = signals.iter().map(|s| s.weight).sum();
    let earned: i32 = signals.iter().filter(|s| s.active).map(|s| s.weight).sum();
    let overall = ((earned as f64 / total as f64) * 100.0).round() as i32;

    let use_case_fit = use_case_fit(snapshot, target_vertical, optimal_size);
    let urgency = urgency(snapshot, recently_updated, has_branches);
    let data_quality = data_quality(snapshot, has_phone, has_website, roles_loaded);

    // Active signals by weight descending; the sort is stable, so equal
    // weights keep declaration order.
    let mut active_signals: Vec<&ScoreSignal> = signals.iter().filter(|s| s.active).collect();
    active_signals.sort_by(|a, b| b.weight.cmp(&a.weight));
    let top_reasons = active_signals
        .iter()
        .take(3)
        .map(|s| s.reason.clone())
        .collect();

    ScoringResult {
        overall,
        use_case_fit,
        urgency,
        data_quality,
        signals,
        top_reasons,
    }
}

fn use_case_fit(snapshot: &EntitySnapshot, target_vertical: bool, optimal_size: bool) -> i32 {
    let mut score = 50;
    if target_vertical {
        score += 30;
    }
    if optimal_size {
        score += 20;
    }
    // Warehousing and transportation carry an extra fit bonus.
    if let Some(code) = &snapshot.industry_code {
        if code.starts_with("52") {
            score += 10;
        }
        if code.starts_with("49") {
            score += 10;
        }
    }
    score.min(100)
}

fn urgency(snapshot: &EntitySnapshot, recently_updated: bool, has_branches: bool) -> i32 {
    let mut score = 40;
    if recently_updated {
        score += 25;
    }
    if has_branches {
        score += 20;
    }
    if snapshot.employee_count.is_some_and(|n| n > 50) {
        score += 15;
    }
    score.min(100)
}

fn data_quality(
    snapshot: &EntitySnapshot,
    has_phone: bool,
    has_website: bool,
    roles_loaded: bool,
) -> i32 {
    let mut score = 30;
    if has_phone {
        score += 20;
    }
    if has_website {
        score += 20;
    }
    if roles_loaded {
        score += 20;
    }
    if snapshot.email.is_some() {
        score += 10;
    }
    score.min(100)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn bare_snapshot() -> EntitySnapshot {
        EntitySnapshot {
            id: Uuid::nil(),
            orgnr: "918654321".into(),
            name: "Fjord Logistikk AS".into(),
            status: EntityStatus::Inactive,
            organization_form_code: None,
            organization_form_name: None,
            founded_date: None,
            municipality: None,
            municipality_number: None,
            county: None,
            postal_code: None,
            address: None,
            industry_code: None,
            industry_description: None,
            employee_count: None,
            phone: None,
            website: None,
            email: None,
            logo_url: None,
            role_data_loaded: false,
            ai_summary: None,
            overall_score: 0,
            use_case_fit: 0,
            urgency_score: 0,
            data_quality_score: 0,
            last_seen_at: now(),
            source_updated_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn strong_snapshot() -> EntitySnapshot {
        EntitySnapshot {
            status: EntityStatus::Active,
            organization_form_code: Some("AS".into()),
            industry_code: Some("52.10".into()),
            employee_count: Some(50),
            phone: Some("+47 22 12 34 56".into()),
            website: Some("https://fjordlogistikk.no".into()),
            email: Some("post@fjordlogistikk.no".into()),
            role_data_loaded: true,
            source_updated_at: Some(now() - Duration::days(10)),
            ..bare_snapshot()
        }
    }

    #[test]
    fn all_signals_active_scores_hundred() {
        let result = score(&strong_snapshot(), &RelatedCounts { sub_entities: 2 }, now());
        assert_eq!(result.overall, 100);
        assert!(result.signals.iter().all(|s| s.active));
    }

    #[test]
    fn all_signals_inactive_scores_zero() {
        let result = score(&bare_snapshot(), &RelatedCounts::default(), now());
        assert_eq!(result.overall, 0);
        assert!(result.signals.iter().all(|s| !s.active));
    }

    #[test]
    fn active_status_alone_scores_twenty() {
        let snapshot = EntitySnapshot {
            status: EntityStatus::Active,
            ..bare_snapshot()
        };
        let result = score(&snapshot, &RelatedCounts::default(), now());
        assert_eq!(result.overall, 20);
        let active: Vec<_> = result.signals.iter().filter(|s| s.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].signal, "company_active");
    }

    #[test]
    fn overall_is_weighted_sum_of_active_signals() {
        let snapshot = strong_snapshot();
        let result = score(&snapshot, &RelatedCounts::default(), now());
        let earned: i32 = result
            .signals
            .iter()
            .filter(|s| s.active)
            .map(|s| s.weight)
            .sum();
        assert_eq!(result.overall, earned);
        assert!((0..=100).contains(&result.overall));
    }

    #[test]
    fn weights_sum_to_hundred() {
        let result = score(&bare_snapshot(), &RelatedCounts::default(), now());
        let total: i32 = result.signals.iter().map(|s| s.weight).sum();
        assert_eq!(total, 100);
        assert_eq!(result.signals.len(), 9);
    }

    #[test]
    fn scoring_is_deterministic() {
        let snapshot = strong_snapshot();
        let related = RelatedCounts { sub_entities: 2 };
        let first = score(&snapshot, &related, now());
        let second = score(&snapshot, &related, now());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn top_reasons_are_heaviest_active_signals() {
        let result = score(&strong_snapshot(), &RelatedCounts { sub_entities: 2 }, now());
        assert_eq!(result.top_reasons.len(), 3);
        // Weight order 20, 20, 15: the two 20s keep declaration order.
        assert_eq!(result.top_reasons[0], "Actively operating");
        assert!(result.top_reasons[1].contains("high automation potential"));
        assert!(result.top_reasons[2].contains("ideal SMB size"));
    }

    #[test]
    fn sub_scores_are_capped_at_hundred() {
        // Warehousing at optimal size in a target vertical: raw fit would be
        // 50 + 30 + 20 + 10 = 110.
        let result = score(&strong_snapshot(), &RelatedCounts { sub_entities: 2 }, now());
        assert_eq!(result.use_case_fit, 100);
        assert_eq!(result.urgency, 85);
        assert_eq!(result.data_quality, 100);
    }

    #[test]
    fn missing_update_timestamp_is_not_recent() {
        let snapshot = EntitySnapshot {
            source_updated_at: None,
            ..strong_snapshot()
        };
        let result = score(&snapshot, &RelatedCounts::default(), now());
        let recent = result
            .signals
            .iter()
            .find(|s| s.signal == "recently_updated")
            .unwrap();
        assert!(!recent.active);
    }

    #[test]
    fn stale_update_is_not_recent() {
        let snapshot = EntitySnapshot {
            source_updated_at: Some(now() - Duration::days(91)),
            ..strong_snapshot()
        };
        let result = score(&snapshot, &RelatedCounts::default(), now());
        let recent = result
            .signals
            .iter()
            .find(|s| s.signal == "recently_updated")
            .unwrap();
        assert!(!recent.active);
    }
}
