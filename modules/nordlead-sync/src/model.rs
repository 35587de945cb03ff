//! Custom scoring models: user-authored signal lists evaluated against a
//! snapshot.
//!
//! Conditions are a closed expression tree over a fixed field whitelist —
//! authored as JSON, evaluated structurally. There is no condition parser and
//! no dynamic code execution; anything outside the whitelist cannot be
//! expressed.

use serde::{Deserialize, Serialize};

use nordlead_common::{EntitySnapshot, RelatedCounts, ScoreSignal};

/// The fields a model condition may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Status,
    EmployeeCount,
    IndustryCode,
    OrganizationFormCode,
    Municipality,
    County,
    Website,
    Phone,
    Email,
    RoleDataLoaded,
    SubEntityCount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Condition tree. Evaluation is total: a missing field or a type mismatch
/// is simply `false`, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Eq { field: FieldRef, value: Literal },
    Ne { field: FieldRef, value: Literal },
    Lt { field: FieldRef, value: i64 },
    Le { field: FieldRef, value: i64 },
    Gt { field: FieldRef, value: i64 },
    Ge { field: FieldRef, value: i64 },
    StartsWith { field: FieldRef, value: String },
    IsSet { field: FieldRef },
    All { exprs: Vec<Expr> },
    Any { exprs: Vec<Expr> },
    Not { expr: Box<Expr> },
}

enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

fn field_value(
    field: FieldRef,
    snapshot: &EntitySnapshot,
    related: &RelatedCounts,
) -> Option<FieldValue> {
    match field {
        FieldRef::Status => Some(FieldValue::Str(snapshot.status.as_str().to_string())),
        FieldRef::EmployeeCount => snapshot.employee_count.map(|n| FieldValue::Int(n as i64)),
        FieldRef::IndustryCode => snapshot.industry_code.clone().map(FieldValue::Str),
        FieldRef::OrganizationFormCode => snapshot
            .organization_form_code
            .clone()
            .map(FieldValue::Str),
        FieldRef::Municipality => snapshot.municipality.clone().map(FieldValue::Str),
        FieldRef::County => snapshot.county.clone().map(FieldValue::Str),
        FieldRef::Website => snapshot.website.clone().map(FieldValue::Str),
        FieldRef::Phone => snapshot.phone.clone().map(FieldValue::Str),
        FieldRef::Email => snapshot.email.clone().map(FieldValue::Str),
        FieldRef::RoleDataLoaded => Some(FieldValue::Bool(snapshot.role_data_loaded)),
        FieldRef::SubEntityCount => Some(FieldValue::Int(related.sub_entities)),
    }
}

impl Expr {
    pub fn eval(&self, snapshot: &EntitySnapshot, related: &RelatedCounts) -> bool {
        match self {
            Expr::Eq { field, value } => compare_eq(*field, value, snapshot, related),
            Expr::Ne { field, value } => {
                field_value(*field, snapshot, related).is_some()
                    && !compare_eq(*field, value, snapshot, related)
            }
            Expr::Lt { field, value } => int_of(*field, snapshot, related).is_some_and(|n| n < *value),
            Expr::Le { field, value } => int_of(*field, snapshot, related).is_some_and(|n| n <= *value),
            Expr::Gt { field, value } => int_of(*field, snapshot, related).is_some_and(|n| n > *value),
            Expr::Ge { field, value } => int_of(*field, snapshot, related).is_some_and(|n| n >= *value),
            Expr::StartsWith { field, value } => {
                matches!(field_value(*field, snapshot, related), Some(FieldValue::Str(s)) if s.starts_with(value.as_str()))
            }
            Expr::IsSet { field } => field_value(*field, snapshot, related).is_some(),
            Expr::All { exprs } => exprs.iter().all(|e| e.eval(snapshot, related)),
            Expr::Any { exprs } => exprs.iter().any(|e| e.eval(snapshot, related)),
            Expr::Not { expr } => !expr.eval(snapshot, related),
        }
    }
}

fn int_of(field: FieldRef, snapshot: &EntitySnapshot, related: &RelatedCounts) -> Option<i64> {
    match field_value(field, snapshot, related) {
        Some(FieldValue::Int(n)) => Some(n),
        _ => None,
    }
}

fn compare_eq(
    field: FieldRef,
    literal: &Literal,
    snapshot: &EntitySnapshot,
    related: &RelatedCounts,
) -> bool {
    match (field_value(field, snapshot, related), literal) {
        (Some(FieldValue::Str(s)), Literal::Str(v)) => s == *v,
        (Some(FieldValue::Int(n)), Literal::Int(v)) => n == *v,
        (Some(FieldValue::Bool(b)), Literal::Bool(v)) => b == *v,
        _ => false,
    }
}

/// One user-authored signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignal {
    pub signal: String,
    pub weight: i32,
    pub when: Expr,
    pub reason_true: String,
    pub reason_false: String,
}

/// A full custom model as persisted in the scoring_models table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringModel {
    pub signals: Vec<ModelSignal>,
}

/// Result of applying a custom model. Unlike the built-in engine, custom
/// models carry no sub-scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelScore {
    pub score: i32,
    pub signals: Vec<ScoreSignal>,
}

impl ScoringModel {
    pub fn from_json(config: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(config.clone())
    }

    pub fn apply(&self, snapshot: &EntitySnapshot, related: &RelatedCounts) -> ModelScore {
        let mut signals = Vec::with_capacity(self.signals.len());
        let mut total = 0i32;
        let mut earned = 0i32;

        for config in &self.signals {
            let active = config.when.eval(snapshot, related);
            total += config.weight;
            if active {
                earned += config.weight;
            }
            signals.push(ScoreSignal {
                signal: config.signal.clone(),
                weight: config.weight,
                reason: if active {
                    config.reason_true.clone()
                } else {
                    config.reason_false.clone()
                },
                active,
            });
        }

        let score = if total > 0 {
            ((earned as f64 / total as f64) * 100.0).round() as i32
        } else {
            0
        };

        ModelScore { score, signals }
    }
}
