//! # Message Structures for pgmq Queues
//!
//! Defines the message format for queue-driven step execution. One message
//! means "run step N of operation X with this context". Human input rides in
//! the message so a queued resumption reaches the executor with the same
//! payload a direct caller would pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{ExecutionContext, HumanInput};

/// Priority levels for step scheduling. pgmq itself delivers in visibility
/// order; the hint rides in the payload for backends and consumers that can
/// order by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    /// Process after normal traffic
    Low,
    /// Standard processing
    Normal,
    /// Process before normal traffic, used for human-decision resumptions
    High,
    /// Process immediately
    Critical,
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Request handed to [`WorkQueue::schedule`](super::WorkQueue::schedule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub operation_id: Uuid,
    pub step_index: u32,
    pub context: ExecutionContext,
    /// Present when this step resumes a paused operation.
    #[serde(default)]
    pub human_input: Option<HumanInput>,
    /// Delay before the message becomes visible.
    pub delay: Duration,
    pub priority: MessagePriority,
    /// Queue name to schedule onto.
    pub endpoint: String,
}

impl ScheduleRequest {
    pub fn new(
        operation_id: Uuid,
        step_index: u32,
        context: ExecutionContext,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            operation_id,
            step_index,
            context,
            human_input: None,
            delay: Duration::ZERO,
            priority: MessagePriority::Normal,
            endpoint: endpoint.into(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_human_input(mut self, human_input: HumanInput) -> Self {
        self.human_input = Some(human_input);
        self
    }
}

/// Message for step execution via queues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMessage {
    /// Operation the step belongs to
    pub operation_id: Uuid,
    /// Step index this delivery asks to run
    pub step_index: u32,
    /// Execution context for the step
    pub context: ExecutionContext,
    /// Human input for resumed operations
    #[serde(default)]
    pub human_input: Option<HumanInput>,
    /// Message metadata
    pub metadata: StepMessageMetadata,
}

/// Metadata for step messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMessageMetadata {
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Requested delivery delay in milliseconds
    pub delay_ms: u64,
    /// Priority hint
    pub priority: MessagePriority,
    /// Message correlation ID for tracking
    pub correlation_id: Option<String>,
}

impl Default for StepMessageMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            delay_ms: 0,
            priority: MessagePriority::Normal,
            correlation_id: Some(Uuid::new_v4().to_string()),
        }
    }
}

impl StepMessage {
    /// Create a new step message with default metadata
    pub fn new(operation_id: Uuid, step_index: u32, context: ExecutionContext) -> Self {
        Self {
            operation_id,
            step_index,
            context,
            human_input: None,
            metadata: StepMessageMetadata::default(),
        }
    }

    /// Build the message for a schedule request, stamping the delay and
    /// priority into the metadata.
    pub fn from_request(request: &ScheduleRequest) -> Self {
        Self {
            operation_id: request.operation_id,
            step_index: request.step_index,
            context: request.context.clone(),
            human_input: request.human_input.clone(),
            metadata: StepMessageMetadata {
                created_at: Utc::now(),
                delay_ms: request.delay.as_millis() as u64,
                priority: request.priority,
                correlation_id: Some(Uuid::new_v4().to_string()),
            },
        }
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Create from JSON from queue
    pub fn from_json(json: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }

    /// Get message age in milliseconds
    pub fn age_ms(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.metadata.created_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
