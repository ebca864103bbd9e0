//! # Runtime Coordinator
//!
//! ## Architecture: Durable Step Execution over Pluggable Backends
//!
//! The RuntimeCoordinator drives agent operations one durable step at a
//! time. Each step delivery claims the step lock, replays the guard
//! checks, delegates the actual agent logic to the [`StepExecutor`], and
//! persists the returned state as a full-document replacement before
//! deciding whether to queue a follow-up step or finalize.
//!
//! ## Key Features
//!
//! - **At-most-once steps**: TTL step lock plus stale-retry guard make
//!   concurrent and duplicate deliveries collapse into one execution
//! - **Boundary interrupts**: cancellation is observed before and after
//!   the executor call, never mid-flight
//! - **Completion reporting**: webhook, stream event, and registered
//!   hooks fire once when an operation stops stepping
//! - **Sync escape hatch**: `execute_sync` drives the same step pipeline
//!   in-process for tests and CLI tools, bypassing the queue
//!
//! ## Delivery Contract
//!
//! `execute_step` is safe to call any number of times for the same
//! `(operation_id, step_index)`: exactly one caller past the lock runs
//! the executor, later duplicates observe `step_count` and no-op.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{EventPublisher, OperationEvent, PublishedEvent};
use crate::locking::StepLock;
use crate::logging;
use crate::messaging::{MessagePriority, ScheduleRequest, WorkQueue};
use crate::models::{
    ExecutionContext, HumanInput, Operation, OperationFailure, OperationStatus, StepResult,
};
use crate::orchestration::callbacks::{CallbackRegistry, StepCallbacks};
use crate::orchestration::completion::{CompletionNotifier, CompletionReason};
use crate::orchestration::executor::StepExecutor;
use crate::orchestration::intervention::{InterventionHandler, PassthroughInterventionHandler};
use crate::orchestration::scheduling::SchedulePlanner;
use crate::orchestration::types::{
    CreateOperationRequest, ExecutionResult, OperationCreated, SyncRunOptions,
};
use crate::storage::StateStore;

/// Coordinates durable step execution for agent operations.
#[derive(Clone)]
pub struct RuntimeCoordinator {
    /// Persists operation state documents
    store: Arc<dyn StateStore>,
    /// Serializes step execution per (operation, step)
    lock: Arc<dyn StepLock>,
    /// Delivers follow-up step messages
    queue: Arc<dyn WorkQueue>,
    /// Runs the actual agent logic
    executor: Arc<dyn StepExecutor>,
    /// Folds human decisions into paused operations
    intervention: Arc<dyn InterventionHandler>,
    /// Per-operation lifecycle hooks
    callbacks: CallbackRegistry,
    /// Stream event fan-out
    event_publisher: EventPublisher,
    /// Completion webhook delivery
    notifier: CompletionNotifier,
    /// Delay/priority planning for follow-up steps
    planner: SchedulePlanner,
    /// Runtime configuration
    config: RuntimeConfig,
}

impl RuntimeCoordinator {
    pub fn new(
        config: RuntimeConfig,
        store: Arc<dyn StateStore>,
        lock: Arc<dyn StepLock>,
        queue: Arc<dyn WorkQueue>,
        executor: Arc<dyn StepExecutor>,
    ) -> Self {
        let event_publisher = EventPublisher::new(config.event_channel_capacity);
        let notifier = CompletionNotifier::new(config.webhook_timeout);
        let planner = SchedulePlanner::new(config.scheduling.clone());

        Self {
            store,
            lock,
            queue,
            executor,
            intervention: Arc::new(PassthroughInterventionHandler),
            callbacks: CallbackRegistry::new(),
            event_publisher,
            notifier,
            planner,
            config,
        }
    }

    /// Replace the default passthrough intervention handler.
    pub fn with_intervention_handler(mut self, handler: Arc<dyn InterventionHandler>) -> Self {
        self.intervention = handler;
        self
    }

    /// Share an existing event publisher instead of the internally created one.
    pub fn with_event_publisher(mut self, event_publisher: EventPublisher) -> Self {
        self.event_publisher = event_publisher;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.event_publisher
    }

    /// Subscribe to the operation event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.event_publisher.subscribe()
    }

    /// Register lifecycle hooks for an operation. Hooks are process-local
    /// and dropped when the operation finalizes.
    pub fn register_callbacks(&self, operation_id: Uuid, callbacks: StepCallbacks) {
        self.callbacks.register(operation_id, callbacks);
    }

    pub fn deregister_callbacks(&self, operation_id: Uuid) -> bool {
        self.callbacks.deregister(operation_id)
    }

    /// Create and persist a new operation. With `auto_start`, step 0 is
    /// scheduled after a short configured delay.
    #[instrument(skip(self, request))]
    pub async fn create_operation(
        &self,
        request: CreateOperationRequest,
    ) -> RuntimeResult<OperationCreated> {
        let operation_id = request.operation_id.unwrap_or_else(Uuid::new_v4);

        let mut operation = Operation::new(operation_id, request.metadata);
        operation.max_steps = request.max_steps;
        operation.cost_limit = request.cost_limit;
        for turn in request.initial_messages {
            operation.push_turn(turn);
        }

        self.store.create(&operation).await?;
        logging::log_operation_lifecycle(
            "create",
            operation_id,
            &operation.status.to_string(),
            Some(if request.auto_start {
                "auto_start"
            } else {
                "manual_start"
            }),
        );
        self.publish(OperationEvent::created(operation_id, request.auto_start))
            .await;

        let message_id = if request.auto_start {
            let context = request.initial_context.unwrap_or_default();
            let schedule = ScheduleRequest::new(
                operation_id,
                0,
                context,
                self.config.queue.endpoint.clone(),
            )
            .with_delay(self.config.initial_step_delay);
            let message_id = self.queue.schedule(schedule).await?;
            debug!(operation_id = %operation_id, message_id, "📤 Scheduled step 0");
            Some(message_id)
        } else {
            None
        };

        Ok(OperationCreated {
            operation_id,
            auto_started: request.auto_start,
            message_id,
        })
    }

    /// [`create_operation`](Self::create_operation) with hooks registered
    /// before step 0 can be delivered.
    pub async fn create_operation_with_callbacks(
        &self,
        request: CreateOperationRequest,
        callbacks: StepCallbacks,
    ) -> RuntimeResult<OperationCreated> {
        let mut request = request;
        let operation_id = request.operation_id.unwrap_or_else(Uuid::new_v4);
        request.operation_id = Some(operation_id);
        self.callbacks.register(operation_id, callbacks);

        match self.create_operation(request).await {
            Ok(created) => Ok(created),
            Err(error) => {
                self.callbacks.deregister(operation_id);
                Err(error)
            }
        }
    }

    /// Execute one step of an operation.
    ///
    /// Queue deliveries land here. Lock contention is a non-error outcome
    /// (`locked=true`); stale and terminal deliveries are successful no-ops.
    #[instrument(skip(self, context, human_input), fields(operation_id = %operation_id, step_index = step_index))]
    pub async fn execute_step(
        &self,
        operation_id: Uuid,
        step_index: u32,
        context: ExecutionContext,
        human_input: Option<HumanInput>,
    ) -> RuntimeResult<ExecutionResult> {
        self.execute_step_inner(operation_id, step_index, context, human_input, true)
            .await
    }

    /// Step pipeline shared by queue and sync paths. The lock is released
    /// on every exit, success or error.
    async fn execute_step_inner(
        &self,
        operation_id: Uuid,
        step_index: u32,
        context: ExecutionContext,
        human_input: Option<HumanInput>,
        schedule_next: bool,
    ) -> RuntimeResult<ExecutionResult> {
        let claimed = self
            .lock
            .try_claim(operation_id, step_index, self.config.lock_ttl)
            .await?;
        if !claimed {
            debug!(
                operation_id = %operation_id,
                step_index,
                "Step lock contended, yielding to current holder"
            );
            return Ok(ExecutionResult::lock_contended());
        }

        let outcome = self
            .execute_claimed(operation_id, step_index, context, human_input, schedule_next)
            .await;

        if let Err(error) = self.lock.release(operation_id, step_index).await {
            warn!(
                operation_id = %operation_id,
                step_index,
                error = %error,
                "Failed to release step lock; lease will expire via TTL"
            );
        }

        outcome
    }

    /// Guard checks and step execution, entered only while holding the lock.
    async fn execute_claimed(
        &self,
        operation_id: Uuid,
        step_index: u32,
        context: ExecutionContext,
        human_input: Option<HumanInput>,
        schedule_next: bool,
    ) -> RuntimeResult<ExecutionResult> {
        let Some(state) = self.store.load(operation_id).await? else {
            return Err(RuntimeError::operation_not_found(operation_id));
        };

        // Duplicate or out-of-order delivery for a step that already ran.
        if state.step_count > step_index {
            debug!(
                operation_id = %operation_id,
                step_index,
                step_count = state.step_count,
                "Stale delivery, step already executed"
            );
            return Ok(ExecutionResult::stale(state));
        }

        if state.status.is_terminal() {
            let reason = CompletionReason::derive(&state);
            info!(
                operation_id = %operation_id,
                step_index,
                status = %state.status,
                "Operation already terminal, ignoring delivery"
            );
            self.callbacks
                .fire_on_complete(operation_id, reason, &state)
                .await;
            self.callbacks.deregister(operation_id);
            return Ok(ExecutionResult::already_terminal(state));
        }

        self.publish(OperationEvent::step_started(operation_id, step_index))
            .await;

        let (persisted, step_result) = match self
            .attempt_step(&state, step_index, context, human_input)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                self.handle_step_failure(operation_id, step_index, &state, &error)
                    .await;
                return Err(error);
            }
        };

        if should_continue(&persisted, &step_result) {
            if !schedule_next {
                debug!(
                    operation_id = %operation_id,
                    step_index,
                    "Continuation left to the synchronous driver"
                );
                return Ok(ExecutionResult::completed(persisted, step_result, false));
            }
            if let Some(next_context) = step_result.next_context.clone() {
                let plan = self.planner.from_events(&persisted, &step_result);
                let schedule = ScheduleRequest::new(
                    operation_id,
                    step_index + 1,
                    next_context,
                    self.config.queue.endpoint.clone(),
                )
                .with_delay(plan.delay)
                .with_priority(plan.priority);
                let message_id = self.queue.schedule(schedule).await?;
                debug!(
                    operation_id = %operation_id,
                    next_step = step_index + 1,
                    message_id,
                    delay_ms = plan.delay.as_millis() as u64,
                    priority = ?plan.priority,
                    "📤 Scheduled next step"
                );
                return Ok(ExecutionResult::completed(persisted, step_result, true));
            }
        }

        let reason = CompletionReason::derive(&persisted);
        self.finalize(operation_id, reason, &persisted).await;
        Ok(ExecutionResult::completed(persisted, step_result, false))
    }

    /// Hooks, intervention merge, executor call, interrupt recheck, persist.
    /// Any error here routes through [`handle_step_failure`](Self::handle_step_failure).
    async fn attempt_step(
        &self,
        state: &Operation,
        step_index: u32,
        context: ExecutionContext,
        human_input: Option<HumanInput>,
    ) -> RuntimeResult<(Operation, StepResult)> {
        let operation_id = state.operation_id;

        self.callbacks
            .fire_before_step(operation_id, step_index, state)
            .await;

        let (exec_state, exec_context) = match human_input {
            Some(input) => {
                let outcome = self
                    .intervention
                    .merge(state.clone(), context, input)
                    .await?;
                (outcome.state, outcome.context)
            }
            None => (state.clone(), context),
        };

        info!(
            operation_id = %operation_id,
            step_index,
            executor = self.executor.executor_name(),
            phase = ?exec_context.phase,
            "🔧 Executing step"
        );
        let started = std::time::Instant::now();
        let mut step_result = self.executor.execute(exec_state, exec_context).await?;

        // A boundary interrupt that landed while the executor ran wins over
        // whatever status the step concluded with.
        if let Some(latest) = self.store.load(operation_id).await? {
            if latest.status == OperationStatus::Interrupted
                && step_result.new_state.status != OperationStatus::Interrupted
            {
                info!(
                    operation_id = %operation_id,
                    step_index,
                    "Interrupt observed at step boundary, overriding step outcome"
                );
                step_result.new_state.status = OperationStatus::Interrupted;
            }
        }

        // Replayed deliveries must see this step as done even when the
        // executor forgot to advance the counter.
        step_result.new_state.step_count = step_result.new_state.step_count.max(step_index + 1);
        step_result.new_state.touch();

        self.store.save(&step_result.new_state).await?;
        logging::log_step_execution(
            "execute_step",
            operation_id,
            step_index,
            &step_result.new_state.status.to_string(),
            Some(started.elapsed().as_millis() as u64),
        );

        for event in &step_result.events {
            self.publish(OperationEvent::step_output(
                operation_id,
                step_index,
                event.clone(),
            ))
            .await;
        }
        self.publish(OperationEvent::step_completed(
            operation_id,
            step_index,
            step_result.new_state.status,
            step_result.events.len(),
        ))
        .await;

        self.callbacks
            .fire_after_step(operation_id, step_index, &step_result.new_state)
            .await;

        let persisted = step_result.new_state.clone();
        Ok((persisted, step_result))
    }

    /// Error workflow for failures between claiming and scheduling: persist
    /// the error status, then report completion through every channel.
    async fn handle_step_failure(
        &self,
        operation_id: Uuid,
        step_index: u32,
        state_before: &Operation,
        error: &RuntimeError,
    ) {
        logging::log_error(
            "runtime_coordinator",
            "execute_step",
            &error.to_string(),
            Some(&format!("operation {operation_id} step {step_index}")),
        );

        let mut error_state = state_before.clone();
        error_state.status = OperationStatus::Error;
        error_state.last_error = Some(failure_from_error(error));
        error_state.touch();

        if let Err(save_error) = self.store.save(&error_state).await {
            warn!(
                operation_id = %operation_id,
                step_index,
                error = %save_error,
                "Failed to persist error state"
            );
        }

        self.publish(OperationEvent::failed(
            operation_id,
            Some(step_index),
            error.to_string(),
        ))
        .await;

        self.finalize(operation_id, CompletionReason::Error, &error_state)
            .await;
    }

    /// Completion fan-out: webhook (best-effort), stream event, hooks.
    async fn finalize(&self, operation_id: Uuid, reason: CompletionReason, state: &Operation) {
        info!(
            operation_id = %operation_id,
            reason = %reason,
            status = %state.status,
            steps = state.step_count,
            cost = state.usage.cost,
            "✅ Operation finished stepping"
        );
        let reason_label = reason.to_string();
        logging::log_operation_lifecycle(
            "finalize",
            operation_id,
            &state.status.to_string(),
            Some(&reason_label),
        );

        if let Err(error) = self.notifier.notify(state, reason).await {
            warn!(
                operation_id = %operation_id,
                error = %error,
                "Completion webhook delivery failed"
            );
        }

        self.publish(OperationEvent::completed(operation_id, reason, state.status))
            .await;

        self.callbacks
            .fire_on_complete(operation_id, reason, state)
            .await;
        self.callbacks.deregister(operation_id);
    }

    /// Mark an operation interrupted. Returns false when it already reached
    /// a terminal status. Cancellation is cooperative: a mid-flight step
    /// notices at its next boundary check.
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn interrupt(&self, operation_id: Uuid) -> RuntimeResult<bool> {
        let Some(mut state) = self.store.load(operation_id).await? else {
            return Err(RuntimeError::operation_not_found(operation_id));
        };

        if state.status.is_terminal() {
            debug!(
                operation_id = %operation_id,
                status = %state.status,
                "Interrupt ignored, operation already terminal"
            );
            return Ok(false);
        }

        state.status = OperationStatus::Interrupted;
        state.touch();
        self.store.save(&state).await?;

        logging::log_operation_lifecycle(
            "interrupt",
            operation_id,
            &OperationStatus::Interrupted.to_string(),
            None,
        );
        self.publish(OperationEvent::interrupted(operation_id)).await;
        Ok(true)
    }

    /// Deliver human input to an operation parked in `waiting_for_human` by
    /// scheduling its next step at high priority. Returns the queue message id.
    #[instrument(skip(self, human_input), fields(operation_id = %operation_id))]
    pub async fn resume(
        &self,
        operation_id: Uuid,
        human_input: HumanInput,
    ) -> RuntimeResult<i64> {
        let Some(state) = self.store.load(operation_id).await? else {
            return Err(RuntimeError::operation_not_found(operation_id));
        };

        if state.status != OperationStatus::WaitingForHuman {
            return Err(RuntimeError::invalid_state(format!(
                "operation {operation_id} is {} and cannot accept human input",
                state.status
            )));
        }

        let context = ExecutionContext::human_decision(human_input.to_payload());
        let schedule = ScheduleRequest::new(
            operation_id,
            state.step_count,
            context,
            self.config.queue.endpoint.clone(),
        )
        .with_priority(MessagePriority::High)
        .with_human_input(human_input);

        let message_id = self.queue.schedule(schedule).await?;
        info!(
            operation_id = %operation_id,
            step_index = state.step_count,
            message_id,
            "📨 Resume scheduled with human input"
        );
        Ok(message_id)
    }

    /// Drive an operation in-process until it stops stepping or the run
    /// bound is hit, bypassing the work queue. Lock contention inside the
    /// loop is an error: nothing else should execute steps concurrently
    /// with a synchronous drive.
    #[instrument(skip(self, options), fields(operation_id = %operation_id))]
    pub async fn execute_sync(
        &self,
        operation_id: Uuid,
        options: SyncRunOptions,
    ) -> RuntimeResult<Operation> {
        let Some(mut last_state) = self.store.load(operation_id).await? else {
            return Err(RuntimeError::operation_not_found(operation_id));
        };

        let bound = options
            .max_steps
            .min(crate::constants::system::MAX_SYNC_STEPS);
        let mut context = options.initial_context.unwrap_or_default();

        for _ in 0..bound {
            if last_state.status.is_terminal() || last_state.status.is_paused() {
                break;
            }

            let step_index = last_state.step_count;
            let result = self
                .execute_step_inner(operation_id, step_index, context.clone(), None, false)
                .await?;

            if result.locked {
                return Err(RuntimeError::invalid_state(format!(
                    "step lock for operation {operation_id} step {step_index} is held elsewhere during a synchronous drive"
                )));
            }
            if let Some(state) = result.state {
                last_state = state;
            }

            match result.step_result.and_then(|r| r.next_context) {
                Some(next)
                    if !last_state.max_steps_reached() && !last_state.cost_limit_stops() =>
                {
                    context = next;
                }
                _ => break,
            }
        }

        debug!(
            operation_id = %operation_id,
            status = %last_state.status,
            step_count = last_state.step_count,
            "Synchronous drive finished"
        );
        Ok(last_state)
    }

    /// Stream publishing is observability only; failures are logged, never
    /// surfaced into the step path.
    async fn publish(&self, event: OperationEvent) {
        if let Err(error) = self.event_publisher.publish_event(event).await {
            warn!(error = %error, "Failed to publish operation event");
        }
    }
}

impl std::fmt::Debug for RuntimeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeCoordinator")
            .field("executor", &self.executor.executor_name())
            .field("queue_endpoint", &self.config.queue.endpoint)
            .field("registered_callbacks", &self.callbacks.registered_count())
            .finish()
    }
}

/// An operation keeps stepping only while its status allows it, its bounds
/// hold, and the last step proposed a follow-up context.
fn should_continue(state: &Operation, step_result: &StepResult) -> bool {
    state.status.is_continuable()
        && !state.max_steps_reached()
        && !state.cost_limit_stops()
        && step_result.next_context.is_some()
}

/// Map a step-path error to the structured failure stored on the operation.
fn failure_from_error(error: &RuntimeError) -> OperationFailure {
    match error {
        RuntimeError::Execution(step_error) => match &step_error.detail {
            Some(detail) => OperationFailure::with_detail(&step_error.message, detail.clone()),
            None => OperationFailure::new(&step_error.message),
        },
        other => OperationFailure::new(other.to_string()),
    }
}
