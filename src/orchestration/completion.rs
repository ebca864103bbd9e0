//! # Completion Reporting
//!
//! Derives why an operation finished and delivers the completion webhook.
//!
//! The webhook is best-effort by contract: one POST attempt, result logged,
//! never allowed to fail the step that triggered it. Products needing
//! durable completion handling should consume the event feed instead.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{Operation, OperationStatus};

/// Why an operation stopped stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Done,
    Error,
    Interrupted,
    WaitingForHuman,
    MaxSteps,
    CostLimit,
}

impl CompletionReason {
    /// Derive the reason from final state. Status wins over bound checks:
    /// an errored operation that also hit `max_steps` reports `error`.
    pub fn derive(state: &Operation) -> Self {
        match state.status {
            OperationStatus::Error => Self::Error,
            OperationStatus::Interrupted => Self::Interrupted,
            OperationStatus::WaitingForHuman => Self::WaitingForHuman,
            OperationStatus::Done => Self::Done,
            OperationStatus::Idle | OperationStatus::Running => {
                if state.max_steps_reached() {
                    Self::MaxSteps
                } else if state.cost_limit_stops() {
                    Self::CostLimit
                } else {
                    Self::Done
                }
            }
        }
    }
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Done => "done",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
            Self::WaitingForHuman => "waiting_for_human",
            Self::MaxSteps => "max_steps",
            Self::CostLimit => "cost_limit",
        };
        write!(f, "{name}")
    }
}

/// Flat completion record POSTed to the webhook and handed to hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub operation_id: Uuid,
    pub reason: CompletionReason,
    pub status: OperationStatus,
    pub cost: f64,
    pub duration_ms: u64,
    pub steps: u32,
    pub tool_calls: u32,
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<Value>,
}

impl CompletionSummary {
    pub fn from_operation(state: &Operation, reason: CompletionReason) -> Self {
        Self {
            operation_id: state.operation_id,
            reason,
            status: state.status,
            cost: state.usage.cost,
            duration_ms: state.duration_ms(),
            steps: state.step_count,
            tool_calls: state.usage.tool_calls,
            total_tokens: state.usage.total_tokens,
            error_message: state.last_error.as_ref().map(|e| e.message.clone()),
            error_detail: state.last_error.as_ref().and_then(|e| e.detail.clone()),
        }
    }

    /// Merge the summary over the webhook's configured static body.
    /// Summary fields win on key collisions.
    pub fn into_webhook_body(self, base: Option<&Value>) -> Value {
        let mut merged = match base {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Ok(Value::Object(fields)) = serde_json::to_value(&self) {
            for (key, value) in fields {
                merged.insert(key, value);
            }
        }
        Value::Object(merged)
    }
}

/// Webhook delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivers completion webhooks.
#[derive(Debug, Clone)]
pub struct CompletionNotifier {
    client: Client,
    timeout: Duration,
}

impl CompletionNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    /// POST the completion summary to the operation's webhook, if one is
    /// configured. Single attempt.
    #[instrument(skip(self, state), fields(operation_id = %state.operation_id, reason = %reason))]
    pub async fn notify(
        &self,
        state: &Operation,
        reason: CompletionReason,
    ) -> Result<(), WebhookError> {
        let Some(webhook) = &state.metadata.completion_webhook else {
            debug!("No completion webhook configured");
            return Ok(());
        };

        let summary = CompletionSummary::from_operation(state, reason);
        let body = summary.into_webhook_body(webhook.body.as_ref());

        let response = self
            .client
            .post(&webhook.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            info!(status = %response.status(), url = %webhook.url, "📤 Completion webhook delivered");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(WebhookError::Status { status, body })
        }
    }
}
