//! In-memory state store for tests and embedded single-process use.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{StateStore, StorageError, StorageResult};
use crate::models::Operation;

/// Map-backed [`StateStore`]. Documents are cloned on the way in and out, so
/// callers never share mutable state with the store.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    operations: RwLock<HashMap<Uuid, Operation>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored operations, handy for test assertions.
    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn create(&self, operation: &Operation) -> StorageResult<()> {
        let mut operations = self.operations.write();
        if operations.contains_key(&operation.operation_id) {
            return Err(StorageError::AlreadyExists {
                operation_id: operation.operation_id,
            });
        }
        operations.insert(operation.operation_id, operation.clone());
        Ok(())
    }

    async fn load(&self, operation_id: Uuid) -> StorageResult<Option<Operation>> {
        Ok(self.operations.read().get(&operation_id).cloned())
    }

    async fn save(&self, operation: &Operation) -> StorageResult<()> {
        self.operations
            .write()
            .insert(operation.operation_id, operation.clone());
        Ok(())
    }

    async fn delete(&self, operation_id: Uuid) -> StorageResult<bool> {
        Ok(self.operations.write().remove(&operation_id).is_some())
    }
}
