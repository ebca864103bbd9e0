//! Typed lifecycle records for the operation event stream.
//!
//! Each variant maps to one canonical event name from [`crate::constants::events`].
//! Subscribers that only care about names and raw JSON can stay on
//! [`PublishedEvent`](super::publisher::PublishedEvent); these records exist so
//! in-process consumers and tests get a stable shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::events;
use crate::models::{OperationStatus, StepEvent};
use crate::orchestration::completion::CompletionReason;

/// One record on the operation event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationEvent {
    Created {
        operation_id: Uuid,
        auto_started: bool,
        occurred_at: DateTime<Utc>,
    },
    StepStarted {
        operation_id: Uuid,
        step_index: u32,
        occurred_at: DateTime<Utc>,
    },
    StepCompleted {
        operation_id: Uuid,
        step_index: u32,
        status: OperationStatus,
        event_count: usize,
        occurred_at: DateTime<Utc>,
    },
    /// One domain event the executor emitted during a step.
    StepOutput {
        operation_id: Uuid,
        step_index: u32,
        event: StepEvent,
    },
    Interrupted {
        operation_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    Completed {
        operation_id: Uuid,
        reason: CompletionReason,
        status: OperationStatus,
        occurred_at: DateTime<Utc>,
    },
    Failed {
        operation_id: Uuid,
        step_index: Option<u32>,
        message: String,
        occurred_at: DateTime<Utc>,
    },
}

impl OperationEvent {
    pub fn created(operation_id: Uuid, auto_started: bool) -> Self {
        Self::Created {
            operation_id,
            auto_started,
            occurred_at: Utc::now(),
        }
    }

    pub fn step_started(operation_id: Uuid, step_index: u32) -> Self {
        Self::StepStarted {
            operation_id,
            step_index,
            occurred_at: Utc::now(),
        }
    }

    pub fn step_completed(
        operation_id: Uuid,
        step_index: u32,
        status: OperationStatus,
        event_count: usize,
    ) -> Self {
        Self::StepCompleted {
            operation_id,
            step_index,
            status,
            event_count,
            occurred_at: Utc::now(),
        }
    }

    pub fn step_output(operation_id: Uuid, step_index: u32, event: StepEvent) -> Self {
        Self::StepOutput {
            operation_id,
            step_index,
            event,
        }
    }

    pub fn interrupted(operation_id: Uuid) -> Self {
        Self::Interrupted {
            operation_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn completed(operation_id: Uuid, reason: CompletionReason, status: OperationStatus) -> Self {
        Self::Completed {
            operation_id,
            reason,
            status,
            occurred_at: Utc::now(),
        }
    }

    pub fn failed(operation_id: Uuid, step_index: Option<u32>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation_id,
            step_index,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Canonical name this record publishes under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => events::OPERATION_CREATED,
            Self::StepStarted { .. } => events::STEP_STARTED,
            Self::StepCompleted { .. } => events::STEP_COMPLETED,
            Self::StepOutput { .. } => events::STEP_EVENT,
            Self::Interrupted { .. } => events::OPERATION_INTERRUPTED,
            Self::Completed { .. } => events::OPERATION_COMPLETED,
            Self::Failed { .. } => events::OPERATION_ERROR,
        }
    }

    /// Operation this record belongs to.
    pub fn operation_id(&self) -> Uuid {
        match self {
            Self::Created { operation_id, .. }
            | Self::StepStarted { operation_id, .. }
            | Self::StepCompleted { operation_id, .. }
            | Self::StepOutput { operation_id, .. }
            | Self::Interrupted { operation_id, .. }
            | Self::Completed { operation_id, .. }
            | Self::Failed { operation_id, .. } => *operation_id,
        }
    }
}
