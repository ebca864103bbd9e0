//! # Orchestration Engine
//!
//! Durable, resumable step execution for long-running agent operations.
//!
//! ## Architecture
//!
//! The engine follows a **delegation-based architecture** where:
//! - **The coordinator owns correctness**: locking, stale-delivery guards,
//!   persistence ordering, interrupt checks, and completion fan-out
//! - **Executors handle intelligence**: one [`StepExecutor`](executor::StepExecutor)
//!   call runs one conversation step (model calls, tool use) and returns the
//!   full replacement state
//! - **The work queue handles time**: delays, priorities, and redelivery live
//!   in the messaging layer
//!
//! ## Core Components
//!
//! - **RuntimeCoordinator**: Main engine that drives the step pipeline from
//!   creation through completion
//! - **StepExecutor**: Seam for the agent reasoning loop
//! - **InterventionHandler**: Merges human decisions into paused operations
//! - **CallbackRegistry**: Coordinator-owned per-operation lifecycle hooks
//! - **SchedulePlanner**: Delay and priority policy for the next step
//! - **CompletionNotifier**: Single-attempt completion webhooks

pub mod callbacks;
pub mod completion;
pub mod coordinator;
pub mod executor;
pub mod intervention;
pub mod scheduling;
pub mod types;

// Re-export core types and components for easy access
pub use callbacks::{
    CallbackRegistry, CompletionHook, CompletionNotice, HookContext, StepCallbacks, StepHook,
};
pub use completion::{CompletionNotifier, CompletionReason, CompletionSummary, WebhookError};
pub use coordinator::RuntimeCoordinator;
pub use executor::{StepExecutionError, StepExecutor};
pub use intervention::{InterventionHandler, InterventionOutcome, PassthroughInterventionHandler};
pub use scheduling::{SchedulePlan, SchedulePlanner};
pub use types::{CreateOperationRequest, ExecutionResult, OperationCreated, SyncRunOptions};
