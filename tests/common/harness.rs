//! Test Harness
//!
//! Wires a RuntimeCoordinator to in-memory backends plus a scriptable
//! executor so integration tests can drive the runtime end to end and
//! inspect every side effect (state, lock, queue, executor calls).

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use agentrun_core::config::RuntimeConfig;
use agentrun_core::locking::InMemoryStepLock;
use agentrun_core::messaging::{InMemoryWorkQueue, StepMessage};
use agentrun_core::models::{
    ExecutionContext, HumanInput, Operation, OperationMetadata, OperationStatus, WebhookConfig,
};
use agentrun_core::orchestration::{ExecutionResult, RuntimeCoordinator};
use agentrun_core::storage::{InMemoryStateStore, StateStore};
use agentrun_core::RuntimeResult;

use super::mock_executor::MockStepExecutor;

pub struct TestHarness {
    pub config: RuntimeConfig,
    pub store: Arc<InMemoryStateStore>,
    pub lock: Arc<InMemoryStepLock>,
    pub queue: Arc<InMemoryWorkQueue>,
    pub executor: Arc<MockStepExecutor>,
    pub coordinator: Arc<RuntimeCoordinator>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::for_testing())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let store = Arc::new(InMemoryStateStore::new());
        let lock = Arc::new(InMemoryStepLock::new());
        let queue = Arc::new(InMemoryWorkQueue::new());
        let executor = Arc::new(MockStepExecutor::new());
        let coordinator = Arc::new(RuntimeCoordinator::new(
            config.clone(),
            store.clone(),
            lock.clone(),
            queue.clone(),
            executor.clone(),
        ));

        Self {
            config,
            store,
            lock,
            queue,
            executor,
            coordinator,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.queue.endpoint
    }

    /// Persist an operation in the given state, bypassing create_operation.
    pub async fn seed_operation(&self, status: OperationStatus, step_count: u32) -> Operation {
        self.seed_with_metadata(status, step_count, OperationMetadata::default())
            .await
    }

    pub async fn seed_with_metadata(
        &self,
        status: OperationStatus,
        step_count: u32,
        metadata: OperationMetadata,
    ) -> Operation {
        let mut operation = Operation::new(Uuid::new_v4(), metadata);
        operation.status = status;
        operation.step_count = step_count;
        self.store.create(&operation).await.expect("seed operation");
        operation
    }

    /// Running operation at step 0, the common starting point.
    pub async fn seed_running(&self) -> Operation {
        self.seed_operation(OperationStatus::Running, 0).await
    }

    /// Running operation whose completion posts to `url`.
    pub async fn seed_with_webhook(&self, url: &str, body: Option<Value>) -> Operation {
        let metadata = OperationMetadata {
            completion_webhook: Some(WebhookConfig {
                url: url.to_string(),
                body,
            }),
            ..OperationMetadata::default()
        };
        self.seed_with_metadata(OperationStatus::Running, 0, metadata)
            .await
    }

    /// Current persisted state. Panics if the operation is missing.
    pub async fn state(&self, operation_id: Uuid) -> Operation {
        self.store
            .load(operation_id)
            .await
            .expect("state store read")
            .expect("operation should exist")
    }

    /// Visible messages on the configured step queue, oldest first.
    pub fn pending(&self) -> Vec<StepMessage> {
        self.queue.pending_messages(self.endpoint())
    }

    /// Deliver one step message the way the queue worker would.
    pub async fn deliver(&self, message: &StepMessage) -> RuntimeResult<ExecutionResult> {
        self.coordinator
            .execute_step(
                message.operation_id,
                message.step_index,
                message.context.clone(),
                message.human_input.clone(),
            )
            .await
    }

    /// Pop the single pending message and deliver it. Panics unless exactly
    /// one message is pending.
    pub async fn deliver_next(&self) -> RuntimeResult<ExecutionResult> {
        let pending = self.pending();
        assert_eq!(
            pending.len(),
            1,
            "expected exactly one pending message, found {}",
            pending.len()
        );
        self.queue.clear(self.endpoint());
        self.deliver(&pending[0]).await
    }

    /// Execute a step directly, without going through the queue.
    pub async fn run_step(
        &self,
        operation_id: Uuid,
        step_index: u32,
    ) -> RuntimeResult<ExecutionResult> {
        self.coordinator
            .execute_step(
                operation_id,
                step_index,
                ExecutionContext::default(),
                None,
            )
            .await
    }

    /// Execute a step carrying human input, as a resume delivery does.
    pub async fn run_step_with_input(
        &self,
        operation_id: Uuid,
        step_index: u32,
        input: HumanInput,
    ) -> RuntimeResult<ExecutionResult> {
        self.coordinator
            .execute_step(
                operation_id,
                step_index,
                ExecutionContext::human_decision(input.to_payload()),
                Some(input),
            )
            .await
    }
}
