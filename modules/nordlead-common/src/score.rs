use serde::{Deserialize, Serialize};

/// One weighted boolean predicate contributing to the overall score,
/// with its human-readable reason for this entity at this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSignal {
    pub signal: String,
    pub weight: i32,
    pub reason: String,
    pub active: bool,
}

/// Full output of one scoring pass. `signals` is emitted in declaration
/// order; identical input always yields a byte-identical result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub overall: i32,
    pub use_case_fit: i32,
    pub urgency: i32,
    pub data_quality: i32,
    pub signals: Vec<ScoreSignal>,
    pub top_reasons: Vec<String>,
}

/// Counts of related rows a score depends on but a snapshot doesn't carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelatedCounts {
    pub sub_entities: i64,
}

/// Leads at or above this overall score are surfaced as high-value.
pub const HIGH_SCORE_THRESHOLD: i32 = 75;

/// Leads at or above this overall score qualify for AI summary generation.
pub const SUMMARY_SCORE_THRESHOLD: i32 = 70;
