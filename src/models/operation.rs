//! # Operation State
//!
//! The durable record for a single long-running agent operation. The whole
//! struct round-trips through the state store as one document; every persist
//! replaces the previous version, so whoever holds the step lock writes the
//! authoritative copy.
//!
//! ## Key Invariants
//!
//! - `step_count` only moves forward. Guards in the coordinator compare it
//!   against the requested step index to neutralize stale queue deliveries.
//! - A terminal status (`done`, `error`, `interrupted`) is never left.
//! - `waiting_for_human` stops continuation but stays resumable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Created but no step has run yet
    Idle,
    /// A step pipeline is live for this operation
    Running,
    /// Paused until a human decision arrives
    WaitingForHuman,
    /// Finished successfully
    Done,
    /// Failed with a recorded error
    Error,
    /// Stopped by an external interrupt
    Interrupted,
}

impl OperationStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Interrupted)
    }

    /// Check if this status allows the pipeline to keep scheduling steps
    pub fn is_continuable(&self) -> bool {
        matches!(self, Self::Idle | Self::Running)
    }

    /// Check if this status is paused awaiting human input
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::WaitingForHuman)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::WaitingForHuman => write!(f, "waiting_for_human"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "waiting_for_human" => Ok(Self::WaitingForHuman),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            "interrupted" => Ok(Self::Interrupted),
            _ => Err(format!("Invalid operation status: {s}")),
        }
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn of the operation's conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: Value) -> Self {
        Self {
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: Value) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: Value) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// What to do when accumulated cost crosses the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostLimitAction {
    /// Stop continuation and complete with reason `cost_limit`
    Stop,
    /// Keep going, the overage is only logged
    Warn,
}

/// Spend ceiling for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostLimit {
    pub max_cost: f64,
    pub on_exceeded: CostLimitAction,
}

/// Accumulated usage across all executed steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub total_tokens: u64,
    pub tool_calls: u32,
    pub cost: f64,
}

/// Completion webhook target. Fired once, single attempt, when the operation
/// stops continuing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Caller-supplied base body; completion fields are merged over it.
    #[serde(default)]
    pub body: Option<Value>,
}

/// Descriptive metadata attached at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Agent definition the executor runs, opaque to the runtime.
    #[serde(default)]
    pub agent: Value,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub completion_webhook: Option<WebhookConfig>,
    #[serde(default)]
    pub custom: HashMap<String, Value>,
}

/// Recorded failure for an errored operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub message: String,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl OperationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail),
        }
    }
}

/// Durable state of one agent operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: Uuid,
    pub status: OperationStatus,
    /// Number of steps that have completed. Step index N executing means the
    /// persisted count moves to N + 1.
    pub step_count: u32,
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default)]
    pub cost_limit: Option<CostLimit>,
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub usage: UsageTotals,
    #[serde(default)]
    pub metadata: OperationMetadata,
    #[serde(default)]
    pub last_error: Option<OperationFailure>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Operation {
    /// Create a fresh idle operation.
    pub fn new(operation_id: Uuid, metadata: OperationMetadata) -> Self {
        let now = Utc::now();
        Self {
            operation_id,
            status: OperationStatus::Idle,
            step_count: 0,
            max_steps: None,
            cost_limit: None,
            messages: Vec::new(),
            usage: UsageTotals::default(),
            metadata,
            last_error: None,
            created_at: now,
            last_modified: now,
        }
    }

    /// True when the configured step ceiling has been reached.
    pub fn max_steps_reached(&self) -> bool {
        match self.max_steps {
            Some(max) => self.step_count >= max,
            None => false,
        }
    }

    /// True when accumulated cost meets or passes the ceiling.
    pub fn cost_limit_exceeded(&self) -> bool {
        match self.cost_limit {
            Some(limit) => self.usage.cost >= limit.max_cost,
            None => false,
        }
    }

    /// True when the cost overage must stop continuation.
    pub fn cost_limit_stops(&self) -> bool {
        self.cost_limit_exceeded()
            && matches!(
                self.cost_limit.map(|l| l.on_exceeded),
                Some(CostLimitAction::Stop)
            )
    }

    /// Append a conversation turn and bump the modification stamp.
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.messages.push(turn);
        self.touch();
    }

    /// Bump the modification stamp.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Wall-clock lifetime of the operation so far, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (Utc::now() - self.created_at).num_milliseconds().max(0) as u64
    }
}
