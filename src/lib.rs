#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Agentrun Core
//!
//! Durable, resumable step-execution runtime for long-running AI agent
//! operations.
//!
//! ## Overview
//!
//! An agent operation is a multi-step conversation loop: call the model,
//! run tools, update state, repeat. Agentrun Core makes that loop durable.
//! Every step is delivered through a work queue, guarded by a distributed
//! step lock, and persisted as a full-document state replacement, so a
//! crashed or duplicated delivery never runs the same step twice and an
//! operation survives process restarts mid-conversation.
//!
//! ## Architecture
//!
//! The crate follows a **delegation-based architecture**: the
//! [`RuntimeCoordinator`](orchestration::RuntimeCoordinator) owns
//! correctness (locking, guards, persistence ordering, interrupts,
//! completion fan-out) while the product supplies the agent intelligence
//! through the [`StepExecutor`](orchestration::StepExecutor) seam. Storage,
//! locking, and queuing are trait seams with PostgreSQL backends for
//! production and in-memory backends for tests.
//!
//! ## Key Features
//!
//! - **At-most-once step execution**: TTL step lock plus a stale-retry
//!   guard collapse duplicate deliveries into one execution
//! - **Queue-driven continuation**: each step schedules the next through
//!   pgmq with computed delay and priority
//! - **Cooperative interrupts**: cancellation is observed at step
//!   boundaries and wins over in-flight step outcomes
//! - **Human in the loop**: operations park in `waiting_for_human` and
//!   resume with an approval, rejection, or free-form reply
//! - **Completion reporting**: webhook, event feed, and per-operation
//!   hooks fire once when an operation stops stepping
//!
//! ## Module Organization
//!
//! - [`models`] - Operation state, execution contexts, step results
//! - [`storage`] - `StateStore` seam with Postgres and in-memory backends
//! - [`locking`] - Distributed TTL step lock
//! - [`messaging`] - Work queue seam, step messages, queue worker
//! - [`orchestration`] - Coordinator, executor seam, scheduling, completion
//! - [`events`] - Operation event feed
//! - [`config`] - Runtime configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agentrun_core::config::RuntimeConfig;
//! use agentrun_core::locking::InMemoryStepLock;
//! use agentrun_core::messaging::InMemoryWorkQueue;
//! use agentrun_core::models::{ExecutionContext, OperationMetadata};
//! use agentrun_core::orchestration::{
//!     CreateOperationRequest, RuntimeCoordinator, StepExecutor,
//! };
//! use agentrun_core::storage::InMemoryStateStore;
//!
//! # async fn example(executor: Arc<dyn StepExecutor>) -> anyhow::Result<()> {
//! let coordinator = RuntimeCoordinator::new(
//!     RuntimeConfig::for_testing(),
//!     Arc::new(InMemoryStateStore::new()),
//!     Arc::new(InMemoryStepLock::new()),
//!     Arc::new(InMemoryWorkQueue::new()),
//!     executor,
//! );
//!
//! let request = CreateOperationRequest::new(OperationMetadata::default())
//!     .auto_started(ExecutionContext::user_input(serde_json::json!("hello")));
//! let created = coordinator.create_operation(request).await?;
//! println!("operation {} queued", created.operation_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests run entirely on the in-memory backends:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod locking;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod storage;

pub use config::{QueueSettings, RuntimeConfig, SchedulingSettings};
pub use constants::{system, DEFAULT_STEP_QUEUE};
// Re-export constants events with a distinct name: `events` is the feed module
pub use constants::events as event_names;
pub use error::{RuntimeError, RuntimeResult};
pub use events::{EventPublisher, OperationEvent, PublishedEvent};
pub use locking::{InMemoryStepLock, LockError, StepLock};
pub use messaging::{
    InMemoryWorkQueue, MessagePriority, MessagingError, QueueConsumer, QueueWorker,
    ScheduleRequest, StepMessage, WorkQueue, WorkerConfig,
};
pub use models::{
    ApprovalDecision, ConversationTurn, CostLimit, CostLimitAction, ExecutionContext,
    ExecutionPhase, HumanInput, Operation, OperationFailure, OperationMetadata, OperationStatus,
    StepEvent, StepEventKind, StepResult, TurnRole, UsageTotals, WebhookConfig,
};
pub use orchestration::{
    CallbackRegistry, CompletionReason, CompletionSummary, CreateOperationRequest,
    ExecutionResult, OperationCreated, RuntimeCoordinator, StepCallbacks, StepExecutionError,
    StepExecutor, SyncRunOptions,
};
pub use storage::{InMemoryStateStore, StateStore, StorageError};

#[cfg(feature = "postgres")]
pub use locking::PostgresStepLock;
#[cfg(feature = "postgres")]
pub use messaging::PgmqWorkQueue;
#[cfg(feature = "postgres")]
pub use storage::PostgresStateStore;
