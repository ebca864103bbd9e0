//! # Orchestration Types
//!
//! Request and result types shared across coordinator operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ConversationTurn, CostLimit, ExecutionContext, Operation, OperationMetadata, StepResult,
};

/// Request to create a new operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOperationRequest {
    /// Caller-chosen id; a fresh v4 UUID is generated when absent.
    pub operation_id: Option<Uuid>,
    pub metadata: OperationMetadata,
    /// Seed transcript, typically the system prompt and the first user turn.
    pub initial_messages: Vec<ConversationTurn>,
    pub max_steps: Option<u32>,
    pub cost_limit: Option<CostLimit>,
    /// Schedule step 0 immediately after persisting.
    pub auto_start: bool,
    /// Context for step 0 when auto-starting.
    pub initial_context: Option<ExecutionContext>,
}

impl CreateOperationRequest {
    pub fn new(metadata: OperationMetadata) -> Self {
        Self {
            operation_id: None,
            metadata,
            initial_messages: Vec::new(),
            max_steps: None,
            cost_limit: None,
            auto_start: false,
            initial_context: None,
        }
    }

    pub fn with_operation_id(mut self, operation_id: Uuid) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    pub fn with_message(mut self, turn: ConversationTurn) -> Self {
        self.initial_messages.push(turn);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_cost_limit(mut self, cost_limit: CostLimit) -> Self {
        self.cost_limit = Some(cost_limit);
        self
    }

    /// Auto-start the operation: step 0 is scheduled with this context as soon
    /// as the state is persisted.
    pub fn auto_started(mut self, context: ExecutionContext) -> Self {
        self.auto_start = true;
        self.initial_context = Some(context);
        self
    }
}

/// Outcome of creating an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCreated {
    pub operation_id: Uuid,
    pub auto_started: bool,
    /// Queue message id for step 0 when auto-started.
    pub message_id: Option<i64>,
}

/// Outcome of one `execute_step` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// False only when the step lock was contended.
    pub success: bool,
    /// True when another holder owned the step lock.
    pub locked: bool,
    /// True when a follow-up step was scheduled on the work queue.
    pub next_step_scheduled: bool,
    /// State observed or produced by this call. Absent on lock contention.
    pub state: Option<Operation>,
    /// Executor output. Absent for guard no-ops (stale retries, terminal states).
    pub step_result: Option<StepResult>,
}

impl ExecutionResult {
    /// Another holder owns the step lock.
    pub fn lock_contended() -> Self {
        Self {
            success: false,
            locked: true,
            next_step_scheduled: false,
            state: None,
            step_result: None,
        }
    }

    /// The requested step already ran; nothing to do.
    pub fn stale(state: Operation) -> Self {
        Self {
            success: true,
            locked: false,
            next_step_scheduled: false,
            state: Some(state),
            step_result: None,
        }
    }

    /// The operation already reached a terminal status.
    pub fn already_terminal(state: Operation) -> Self {
        Self {
            success: true,
            locked: false,
            next_step_scheduled: false,
            state: Some(state),
            step_result: None,
        }
    }

    /// The step executed and persisted.
    pub fn completed(state: Operation, step_result: StepResult, next_step_scheduled: bool) -> Self {
        Self {
            success: true,
            locked: false,
            next_step_scheduled,
            state: Some(state),
            step_result: Some(step_result),
        }
    }

    /// True when this call actually ran the executor.
    pub fn executed(&self) -> bool {
        self.step_result.is_some()
    }
}

/// Options for driving an operation synchronously, bypassing the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunOptions {
    /// Steps this run may drive before returning, independent of the
    /// operation's own `max_steps` bound.
    pub max_steps: u32,
    /// Context for the first step of the run.
    pub initial_context: Option<ExecutionContext>,
}

impl Default for SyncRunOptions {
    fn default() -> Self {
        Self {
            max_steps: 25,
            initial_context: None,
        }
    }
}

impl SyncRunOptions {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_initial_context(mut self, context: ExecutionContext) -> Self {
        self.initial_context = Some(context);
        self
    }
}
