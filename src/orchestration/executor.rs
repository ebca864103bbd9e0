//! # Step Executor Seam
//!
//! ## Architecture: Delegation-Based Step Execution
//!
//! The runtime coordinates durability, locking, and scheduling while the
//! product supplies the actual agent logic through the [`StepExecutor`]
//! trait. One call to [`StepExecutor::execute`] is one step: the
//! implementation typically calls the model, runs tools, and returns the
//! complete replacement state plus whatever should happen next.
//!
//! Implementations own their side effects. The runtime treats the returned
//! [`StepResult`] as the single source of truth for the operation's new
//! state and never merges it with the previous document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ExecutionContext, Operation, StepResult};

/// Domain failure raised by a step executor.
///
/// Distinct from infrastructure errors: a `StepExecutionError` means the
/// agent logic itself failed (model refusal, tool crash, unrecoverable
/// input) and drives the operation into the `error` status rather than
/// being retried by the queue.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct StepExecutionError {
    /// Human-readable failure description.
    pub message: String,
    /// Structured detail for diagnostics, recorded on the operation.
    pub detail: Option<Value>,
}

impl StepExecutionError {
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

/// Execution seam between the runtime and the agent product.
#[async_trait::async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executor name for logging.
    fn executor_name(&self) -> &'static str {
        "step_executor"
    }

    /// Run one step against the current state.
    ///
    /// `state` is the operation document as persisted before this step;
    /// `context` carries the input that triggered it. The returned
    /// [`StepResult::new_state`] fully replaces the stored document.
    async fn execute(
        &self,
        state: Operation,
        context: ExecutionContext,
    ) -> Result<StepResult, StepExecutionError>;
}
