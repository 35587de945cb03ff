//! AI lead summaries via an OpenAI-compatible chat completions endpoint.
//!
//! Summary generation is decoration on top of a scored lead: any failure
//! falls back to a deterministic template built from the snapshot and never
//! propagates into the sync flow.

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use nordlead_common::{Config, EntitySnapshot};

use crate::mapper::industry_vertical;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub what_they_do: String,
    pub why_automation: String,
    pub top_use_cases: Vec<String>,
    pub pitch_angle: String,
    pub risk_notes: Vec<String>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a sales analyst identifying automation \
opportunities for Nordic companies. Generate concise, actionable insights \
from the available data. State uncertainty explicitly when data is sparse. \
Keep the whole answer under 120 words. Respond as a JSON object with the \
keys whatTheyDo, whyAutomation, topUseCases, pitchAngle, riskNotes.";

pub struct Summarizer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Summarizer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.ai_api_key.is_empty() {
            return None;
        }
        Some(Self::new(
            &config.ai_api_key,
            &config.ai_api_base_url,
            &config.ai_model,
        ))
    }

    /// Summarize a lead. Falls back to a deterministic template on any
    /// failure — the caller never sees an error.
    pub async fn summarize(&self, snapshot: &EntitySnapshot) -> String {
        let summary = match self.generate(snapshot).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(orgnr = %snapshot.orgnr, error = %err, "AI summary failed, using fallback");
                fallback_summary(snapshot)
            }
        };
        format_as_text(&summary)
    }

    async fn generate(&self, snapshot: &EntitySnapshot) -> Result<CompanySummary> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(snapshot),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.7,
            max_tokens: 500,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, orgnr = %snapshot.orgnr, "Summary request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Summary API error ({status}): {body}"));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Empty summary response"))?;

        Ok(serde_json::from_str(&content)?)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

fn build_prompt(snapshot: &EntitySnapshot) -> String {
    let mut parts = vec![
        format!("Company: {}", snapshot.name),
        format!("Organization number: {}", snapshot.orgnr),
        format!("Status: {}", snapshot.status),
    ];
    if let Some(form) = &snapshot.organization_form_name {
        parts.push(format!("Legal form: {form}"));
    }
    if let Some(industry) = &snapshot.industry_description {
        parts.push(format!("Industry: {industry}"));
    }
    if let Some(count) = snapshot.employee_count {
        parts.push(format!("Employees: {count}"));
    }
    if let Some(municipality) = &snapshot.municipality {
        parts.push(format!("Location: {municipality}"));
    }
    if let Some(website) = &snapshot.website {
        parts.push(format!("Website: {website}"));
    }
    parts.join("\n")
}

/// Deterministic summary built only from snapshot fields.
fn fallback_summary(snapshot: &EntitySnapshot) -> CompanySummary {
    let industry = snapshot
        .industry_description
        .clone()
        .unwrap_or_else(|| "an unspecified industry".to_string());
    let vertical = snapshot
        .industry_code
        .as_deref()
        .and_then(industry_vertical);

    let mut risk_notes = Vec::new();
    if snapshot.website.is_none() {
        risk_notes.push("No website - digital maturity unclear".to_string());
    }
    if snapshot.phone.is_none() && snapshot.email.is_none() {
        risk_notes.push("No contact details on record".to_string());
    }

    CompanySummary {
        what_they_do: format!("{} operates in {industry}.", snapshot.name),
        why_automation: match vertical {
            Some(v) => format!("{v} typically carries repetitive, automatable workflows."),
            None => "Industry automation potential not assessed.".to_string(),
        },
        top_use_cases: vec![
            "Document handling and approval workflows".to_string(),
            "Customer inquiry triage".to_string(),
        ],
        pitch_angle: "Lead with reducing manual data entry in day-to-day operations."
            .to_string(),
        risk_notes,
    }
}

/// Persisted text form of a summary.
pub fn format_as_text(summary: &CompanySummary) -> String {
    let mut out = String::new();
    out.push_str("What they do:\n");
    out.push_str(&summary.what_they_do);
    out.push_str("\n\nWhy automation:\n");
    out.push_str(&summary.why_automation);
    out.push_str("\n\nTop use cases:\n");
    for use_case in &summary.top_use_cases {
        out.push_str("- ");
        out.push_str(use_case);
        out.push('\n');
    }
    out.push_str("\nPitch angle:\n");
    out.push_str(&summary.pitch_angle);
    out.push_str("\n\nRisk notes:\n");
    if summary.risk_notes.is_empty() {
        out.push_str("- None\n");
    } else {
        for note in &summary.risk_notes {
            out.push_str("- ");
            out.push_str(note);
            out.push('\n');
        }
    }
    out
}
