//! # Per-Operation Callbacks
//!
//! In-process hooks fired around step execution and at completion.
//!
//! Hooks are async functions registered per operation id. They must be:
//! - `Send + Sync` for thread-safe sharing
//! - Return a pinned future for async execution
//! - Return `anyhow::Result<()>` for error handling
//!
//! Hook failures are logged and swallowed: a broken observer must never
//! stall the operation it observes. Registrations last for one run: when
//! the operation stops stepping (completion, pause, or failure) the
//! coordinator fires `on_complete` and drops the bundle, so a resumed
//! operation needs fresh hooks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Operation;
use crate::orchestration::completion::CompletionReason;

/// Hook fired before or after a single step.
pub type StepHook = Arc<
    dyn Fn(HookContext) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
>;

/// Hook fired exactly once when an operation finishes.
pub type CompletionHook = Arc<
    dyn Fn(CompletionNotice) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Snapshot handed to step hooks.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub operation_id: Uuid,
    pub step_index: u32,
    /// State before the step for `on_before_step`, after it for `on_after_step`.
    pub state: Operation,
}

/// Snapshot handed to completion hooks.
#[derive(Debug, Clone)]
pub struct CompletionNotice {
    pub operation_id: Uuid,
    pub reason: CompletionReason,
    pub state: Operation,
}

/// Hook bundle registered for one operation.
#[derive(Clone, Default)]
pub struct StepCallbacks {
    pub on_before_step: Option<StepHook>,
    pub on_after_step: Option<StepHook>,
    pub on_complete: Option<CompletionHook>,
}

impl StepCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_step(mut self, hook: StepHook) -> Self {
        self.on_before_step = Some(hook);
        self
    }

    pub fn on_after_step(mut self, hook: StepHook) -> Self {
        self.on_after_step = Some(hook);
        self
    }

    pub fn on_complete(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }
}

impl std::fmt::Debug for StepCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepCallbacks")
            .field("on_before_step", &self.on_before_step.is_some())
            .field("on_after_step", &self.on_after_step.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Concurrent registry of per-operation hooks.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    hooks: Arc<DashMap<Uuid, StepCallbacks>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            hooks: Arc::new(DashMap::new()),
        }
    }

    /// Register hooks for an operation, replacing any previous bundle.
    pub fn register(&self, operation_id: Uuid, callbacks: StepCallbacks) {
        debug!(operation_id = %operation_id, callbacks = ?callbacks, "Registering step callbacks");
        self.hooks.insert(operation_id, callbacks);
    }

    /// Drop hooks for an operation. Returns whether a bundle was present.
    pub fn deregister(&self, operation_id: Uuid) -> bool {
        let removed = self.hooks.remove(&operation_id).is_some();
        if removed {
            debug!(operation_id = %operation_id, "Deregistered step callbacks");
        }
        removed
    }

    pub fn is_registered(&self, operation_id: Uuid) -> bool {
        self.hooks.contains_key(&operation_id)
    }

    pub fn registered_count(&self) -> usize {
        self.hooks.len()
    }

    pub async fn fire_before_step(&self, operation_id: Uuid, step_index: u32, state: &Operation) {
        let Some(hook) = self
            .hooks
            .get(&operation_id)
            .and_then(|entry| entry.on_before_step.clone())
        else {
            return;
        };
        let context = HookContext {
            operation_id,
            step_index,
            state: state.clone(),
        };
        if let Err(error) = hook(context).await {
            warn!(
                operation_id = %operation_id,
                step_index = step_index,
                error = %error,
                "on_before_step hook failed"
            );
        }
    }

    pub async fn fire_after_step(&self, operation_id: Uuid, step_index: u32, state: &Operation) {
        let Some(hook) = self
            .hooks
            .get(&operation_id)
            .and_then(|entry| entry.on_after_step.clone())
        else {
            return;
        };
        let context = HookContext {
            operation_id,
            step_index,
            state: state.clone(),
        };
        if let Err(error) = hook(context).await {
            warn!(
                operation_id = %operation_id,
                step_index = step_index,
                error = %error,
                "on_after_step hook failed"
            );
        }
    }

    pub async fn fire_on_complete(
        &self,
        operation_id: Uuid,
        reason: CompletionReason,
        state: &Operation,
    ) {
        let Some(hook) = self
            .hooks
            .get(&operation_id)
            .and_then(|entry| entry.on_complete.clone())
        else {
            return;
        };
        let notice = CompletionNotice {
            operation_id,
            reason,
            state: state.clone(),
        };
        if let Err(error) = hook(notice).await {
            warn!(
                operation_id = %operation_id,
                reason = %reason,
                error = %error,
                "on_complete hook failed"
            );
        }
    }
}
