//! # Core Data Model
//!
//! Persistent state for agent operations plus the value types that flow through
//! the step pipeline: execution contexts in, step results out.

pub mod context;
pub mod operation;
pub mod step_result;

// Re-export core models for easy access
pub use context::{ApprovalDecision, ExecutionContext, ExecutionPhase, HumanInput, SessionInfo};
pub use operation::{
    ConversationTurn, CostLimit, CostLimitAction, Operation, OperationFailure, OperationMetadata,
    OperationStatus, TurnRole, UsageTotals, WebhookConfig,
};
pub use step_result::{StepEvent, StepEventKind, StepResult};
