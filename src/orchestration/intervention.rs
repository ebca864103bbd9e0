//! # Human Intervention
//!
//! Merges human input into a paused operation before the next step runs.
//!
//! When an operation sits in `waiting_for_human` and a resume message
//! arrives carrying [`HumanInput`], the coordinator routes it through an
//! [`InterventionHandler`] so the product can decide how approvals,
//! rejections, and free-form replies reshape the state. The
//! [`PassthroughInterventionHandler`] covers the common case: flip the
//! status back to `running`, append any human message to the transcript,
//! and hand the decision payload to the executor as context.

use tracing::debug;

use crate::models::{
    ConversationTurn, ExecutionContext, HumanInput, Operation, OperationStatus,
};
use crate::orchestration::executor::StepExecutionError;

/// State and context produced by merging human input.
#[derive(Debug, Clone)]
pub struct InterventionOutcome {
    pub state: Operation,
    pub context: ExecutionContext,
}

/// Hook for folding human decisions into operation state.
#[async_trait::async_trait]
pub trait InterventionHandler: Send + Sync {
    async fn merge(
        &self,
        state: Operation,
        context: ExecutionContext,
        input: HumanInput,
    ) -> Result<InterventionOutcome, StepExecutionError>;
}

/// Default handler: resume the operation and surface the decision as context.
#[derive(Debug, Clone, Default)]
pub struct PassthroughInterventionHandler;

#[async_trait::async_trait]
impl InterventionHandler for PassthroughInterventionHandler {
    async fn merge(
        &self,
        mut state: Operation,
        _context: ExecutionContext,
        input: HumanInput,
    ) -> Result<InterventionOutcome, StepExecutionError> {
        debug!(
            operation_id = %state.operation_id,
            decision = ?input.decision,
            "Merging human input into paused operation"
        );

        if state.status == OperationStatus::WaitingForHuman {
            state.status = OperationStatus::Running;
        }

        if let Some(message) = &input.message {
            state.push_turn(ConversationTurn::user(serde_json::Value::String(
                message.clone(),
            )));
        }

        let context = ExecutionContext::human_decision(input.to_payload());
        Ok(InterventionOutcome { state, context })
    }
}
