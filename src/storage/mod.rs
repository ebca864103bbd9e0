//! # Operation State Store
//!
//! Persistence seam for [`Operation`] documents. The runtime writes whole
//! documents: every save replaces the stored state, and only the step-lock
//! holder saves, so readers never observe a half-applied step.
//!
//! Two backends ship with the crate: Postgres (JSONB) for deployments and an
//! in-memory map for tests and embedded use.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Operation, OperationMetadata};

pub use memory::InMemoryStateStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStateStore;

/// Errors from state store backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage connection error: {message}")]
    Connection { message: String },

    #[error("Storage query error: {operation}: {message}")]
    Query { operation: String, message: String },

    #[error("State serialization error: {message}")]
    Serialization { message: String },

    #[error("Operation {operation_id} already exists")]
    AlreadyExists { operation_id: Uuid },
}

impl StorageError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                StorageError::connection(err.to_string())
            }
            other => StorageError::query("sqlx", other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store for operation state documents.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a brand-new operation. Fails with [`StorageError::AlreadyExists`]
    /// when the id is taken.
    async fn create(&self, operation: &Operation) -> StorageResult<()>;

    /// Load the current document, `None` when the operation was never created.
    async fn load(&self, operation_id: Uuid) -> StorageResult<Option<Operation>>;

    /// Replace the stored document with this one.
    async fn save(&self, operation: &Operation) -> StorageResult<()>;

    /// Load only the metadata portion of the document, `None` when the
    /// operation was never created. Backends may project this without
    /// materializing the full state.
    async fn load_metadata(
        &self,
        operation_id: Uuid,
    ) -> StorageResult<Option<OperationMetadata>> {
        Ok(self.load(operation_id).await?.map(|op| op.metadata))
    }

    /// Remove the document. Returns whether anything was deleted.
    async fn delete(&self, operation_id: Uuid) -> StorageResult<bool>;
}
