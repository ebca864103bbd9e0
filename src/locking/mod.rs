//! # Distributed Step Lock
//!
//! At-most-once execution guard for `(operation_id, step_index)`. A claim is a
//! lease: it expires after the configured TTL, so a crashed holder blocks its
//! step only until the lease runs out, never forever. There is no heartbeat
//! extension; the TTL must be sized above the longest expected step.
//!
//! Claiming an expired lease succeeds and takes it over. Release is idempotent
//! and releasing a lock that is not held is a no-op.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryStepLock;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStepLock;

/// Errors from lock backends
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock backend error: {message}")]
    Backend { message: String },

    #[error("Lock query error: {operation}: {message}")]
    Query { operation: String, message: String },
}

impl LockError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for LockError {
    fn from(err: sqlx::Error) -> Self {
        LockError::query("sqlx", err.to_string())
    }
}

pub type LockResult<T> = Result<T, LockError>;

/// Lease-based mutual exclusion per operation step.
#[async_trait]
pub trait StepLock: Send + Sync {
    /// Try to take the lease for this step. Returns `true` when this caller now
    /// holds it, `false` when another holder's lease is still live.
    async fn try_claim(
        &self,
        operation_id: Uuid,
        step_index: u32,
        ttl: Duration,
    ) -> LockResult<bool>;

    /// Give the lease back. Safe to call when the lease is not held.
    async fn release(&self, operation_id: Uuid, step_index: u32) -> LockResult<()>;
}
