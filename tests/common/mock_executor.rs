//! Mock Step Executor for Testing
//!
//! Provides a scriptable implementation of the StepExecutor trait for
//! testing the runtime core without a real agent loop. Each invocation
//! pops the next scripted outcome and records the call for assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use agentrun_core::models::{
    ConversationTurn, ExecutionContext, ExecutionPhase, Operation, OperationStatus, StepEvent,
    StepEventKind, StepResult,
};
use agentrun_core::orchestration::{StepExecutionError, StepExecutor};

/// One recorded executor invocation.
#[derive(Debug, Clone)]
pub struct ExecutorCall {
    pub operation_id: Uuid,
    /// `step_count` of the state handed to the executor.
    pub step_count: u32,
    pub status: OperationStatus,
    pub phase: ExecutionPhase,
    pub payload: Value,
    /// Transcript length at call time, for intervention-merge assertions.
    pub message_count: usize,
}

/// Scripted outcome for one executor invocation.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    /// Keep running: bump cost, emit events, propose a follow-up context.
    Continue {
        cost: f64,
        events: Vec<StepEventKind>,
    },
    /// Park the operation for human input.
    Wait,
    /// Conclude with the given status and no follow-up context.
    Finish(OperationStatus),
    /// Fail with a domain error.
    Fail(String),
}

impl ScriptedStep {
    pub fn advance() -> Self {
        Self::Continue {
            cost: 0.0,
            events: Vec::new(),
        }
    }

    pub fn advance_with_cost(cost: f64) -> Self {
        Self::Continue {
            cost,
            events: Vec::new(),
        }
    }

    pub fn advance_with_events(events: Vec<StepEventKind>) -> Self {
        Self::Continue { cost: 0.0, events }
    }

    pub fn done() -> Self {
        Self::Finish(OperationStatus::Done)
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<ScriptedStep>,
    calls: Vec<ExecutorCall>,
    delay: Option<Duration>,
}

/// Scriptable step executor that records every invocation.
///
/// An exhausted script falls back to [`ScriptedStep::done`] so driver
/// loops always terminate.
#[derive(Debug, Default)]
pub struct MockStepExecutor {
    state: Mutex<MockState>,
}

impl MockStepExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one scripted outcome.
    pub fn script(&self, step: ScriptedStep) {
        self.state.lock().unwrap().script.push_back(step);
    }

    /// Queue several scripted outcomes in order.
    pub fn script_steps(&self, steps: impl IntoIterator<Item = ScriptedStep>) {
        let mut state = self.state.lock().unwrap();
        state.script.extend(steps);
    }

    /// Make every invocation take this long, for boundary-race tests.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl StepExecutor for MockStepExecutor {
    fn executor_name(&self) -> &'static str {
        "mock_executor"
    }

    async fn execute(
        &self,
        state: Operation,
        context: ExecutionContext,
    ) -> Result<StepResult, StepExecutionError> {
        let (scripted, delay) = {
            let mut guard = self.state.lock().unwrap();
            guard.calls.push(ExecutorCall {
                operation_id: state.operation_id,
                step_count: state.step_count,
                status: state.status,
                phase: context.phase,
                payload: context.payload.clone(),
                message_count: state.messages.len(),
            });
            (guard.script.pop_front(), guard.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let step_index = state.step_count;
        match scripted.unwrap_or_else(ScriptedStep::done) {
            ScriptedStep::Continue { cost, events } => {
                let mut next = state;
                next.status = OperationStatus::Running;
                next.usage.cost += cost;
                next.usage.total_tokens += 100;
                next.push_turn(ConversationTurn::assistant(json!(format!(
                    "step {step_index} output"
                ))));
                let mut result = StepResult::new(next).with_next_context(
                    ExecutionContext::tool_result(json!({ "step": step_index })),
                );
                for kind in events {
                    result = result.with_event(StepEvent::new(kind, json!({ "step": step_index })));
                }
                Ok(result)
            }
            ScriptedStep::Wait => {
                let mut next = state;
                next.status = OperationStatus::WaitingForHuman;
                Ok(StepResult::new(next))
            }
            ScriptedStep::Finish(status) => {
                let mut next = state;
                next.status = status;
                Ok(StepResult::new(next)
                    .with_event(StepEvent::new(StepEventKind::Done, json!({}))))
            }
            ScriptedStep::Fail(message) => Err(StepExecutionError::with_detail(
                message,
                json!({ "step": step_index }),
            )),
        }
    }
}
