//! Outbound event delivery: Slack, Microsoft Teams, and generic webhooks.
//!
//! Delivery is fire-and-forget from the caller's point of view — no retries
//! here; the caller logs per-target outcomes and moves on.

pub mod error;

pub use error::{Result, WebhookError};

use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// An event payload as posted to generic webhook targets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

pub struct WebhookClient {
    http: reqwest::Client,
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Post a message to a Slack incoming webhook.
    pub async fn send_slack(&self, webhook_url: &str, text: &str) -> Result<()> {
        debug!(target = "slack", "Delivering webhook event");
        self.post(webhook_url, None, &json!({ "text": text })).await
    }

    /// Post a MessageCard to a Microsoft Teams incoming webhook.
    pub async fn send_teams(&self, webhook_url: &str, title: &str, text: &str) -> Result<()> {
        debug!(target = "teams", "Delivering webhook event");
        let card = json!({
            "@type": "MessageCard",
            "@context": "https://schema.org/extensions",
            "summary": title,
            "title": title,
            "text": text,
        });
        self.post(webhook_url, None, &card).await
    }

    /// Post a raw event payload to a generic webhook, with an optional
    /// bearer token.
    pub async fn send_generic(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        payload: &EventPayload,
    ) -> Result<()> {
        debug!(target = "webhook", event = payload.event.as_str(), "Delivering webhook event");
        self.post(url, bearer_token, payload).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        body: &T,
    ) -> Result<()> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WebhookError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_payload_serializes_with_camel_case_keys() {
        let payload = EventPayload {
            event: "lead.high_score".into(),
            data: json!({ "orgnr": "918654321", "score": 85 }),
            timestamp: "2025-06-01T12:00:00Z".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["event"], "lead.high_score");
        assert_eq!(value["data"]["score"], 85);
        assert!(value.get("timestamp").is_some());
    }
}
