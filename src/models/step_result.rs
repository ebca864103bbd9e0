//! Output of a single executor step.
//!
//! A step hands back the complete replacement operation state, the context for
//! the next step when the conversation should continue, and the events the step
//! produced. The coordinator reads the events to plan the next delay and streams
//! them to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ExecutionContext;
use super::operation::Operation;

/// What kind of event a step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEventKind {
    /// Model produced output
    LlmResult,
    /// Model requested a tool invocation
    ToolCall,
    /// A tool invocation returned
    ToolResult,
    /// The agent declared the operation finished
    Done,
    /// Something inside the step failed but the step still returned
    Error,
}

impl StepEventKind {
    /// Tool traffic gets extra scheduling delay before the next step.
    pub fn is_tool_traffic(&self) -> bool {
        matches!(self, Self::ToolCall | Self::ToolResult)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// One event emitted during a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub kind: StepEventKind,
    #[serde(default)]
    pub data: Value,
    pub occurred_at: DateTime<Utc>,
}

impl StepEvent {
    pub fn new(kind: StepEventKind, data: Value) -> Self {
        Self {
            kind,
            data,
            occurred_at: Utc::now(),
        }
    }
}

/// Everything a completed step reports back to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Full replacement state. The coordinator persists exactly this, after
    /// enforcing the step-count floor and the interrupt recheck.
    pub new_state: Operation,
    /// Context for the next step; absent means the conversation ended.
    #[serde(default)]
    pub next_context: Option<ExecutionContext>,
    /// Events produced during the step, in occurrence order.
    #[serde(default)]
    pub events: Vec<StepEvent>,
}

impl StepResult {
    pub fn new(new_state: Operation) -> Self {
        Self {
            new_state,
            next_context: None,
            events: Vec::new(),
        }
    }

    pub fn with_next_context(mut self, context: ExecutionContext) -> Self {
        self.next_context = Some(context);
        self
    }

    pub fn with_event(mut self, event: StepEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Count of error events, drives retry backoff for the next step.
    pub fn error_event_count(&self) -> u32 {
        self.events.iter().filter(|e| e.kind.is_error()).count() as u32
    }

    /// True when the step produced tool calls or tool results.
    pub fn has_tool_traffic(&self) -> bool {
        self.events.iter().any(|e| e.kind.is_tool_traffic())
    }
}
