//! Error types for the agent runtime.
//!
//! Module-level errors (`StorageError`, `LockError`, `MessagingError`, ...) stay
//! close to the code that produces them; this module defines the crate-wide
//! [`RuntimeError`] they converge into at the coordinator boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::locking::LockError;
use crate::messaging::MessagingError;
use crate::orchestration::executor::StepExecutionError;
use crate::storage::StorageError;

/// Top-level error type returned by coordinator operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Lock error: {0}")]
    Locking(#[from] LockError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Step execution error: {0}")]
    Execution(#[from] StepExecutionError),

    #[error("Operation {operation_id} was never created")]
    OperationNotFound { operation_id: Uuid },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RuntimeError {
    /// Create an operation-not-found error. Missing state is a caller bug, not a
    /// transient condition, which is why it gets its own variant.
    pub fn operation_not_found(operation_id: Uuid) -> Self {
        Self::OperationNotFound { operation_id }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True when a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RuntimeError::Storage(_) | RuntimeError::Locking(_) | RuntimeError::Messaging(_) => {
                true
            }
            RuntimeError::Execution(_)
            | RuntimeError::OperationNotFound { .. }
            | RuntimeError::InvalidState(_)
            | RuntimeError::Configuration(_) => false,
        }
    }
}

pub type RuntimeResult<T> = anyhow::Result<T, RuntimeError>;
