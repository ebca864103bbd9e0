//! Postgres state store.
//!
//! One JSONB document per operation. Writes go through
//! `INSERT .. ON CONFLICT DO UPDATE`, so a save is a full replacement of
//! whatever was stored before, matching the single-writer step pipeline.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{StateStore, StorageError, StorageResult};
use crate::models::{Operation, OperationMetadata};

/// JSONB-backed [`StateStore`].
#[derive(Debug, Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table when it does not exist yet. Intended for
    /// startup paths and test bootstrap; production schemas normally migrate.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_operations (
                operation_id UUID PRIMARY KEY,
                state JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("agent_operations table ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for PostgresStateStore {
    #[instrument(skip(self, operation), fields(operation_id = %operation.operation_id))]
    async fn create(&self, operation: &Operation) -> StorageResult<()> {
        let document = serde_json::to_value(operation)?;

        let result = sqlx::query(
            r#"
            INSERT INTO agent_operations (operation_id, state)
            VALUES ($1, $2)
            ON CONFLICT (operation_id) DO NOTHING
            "#,
        )
        .bind(operation.operation_id)
        .bind(document)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::AlreadyExists {
                operation_id: operation.operation_id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(operation_id = %operation_id))]
    async fn load(&self, operation_id: Uuid) -> StorageResult<Option<Operation>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM agent_operations WHERE operation_id = $1")
                .bind(operation_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((document,)) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, operation), fields(operation_id = %operation.operation_id))]
    async fn save(&self, operation: &Operation) -> StorageResult<()> {
        let document = serde_json::to_value(operation)?;

        sqlx::query(
            r#"
            INSERT INTO agent_operations (operation_id, state)
            VALUES ($1, $2)
            ON CONFLICT (operation_id)
            DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(operation.operation_id)
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(operation_id = %operation_id))]
    async fn load_metadata(
        &self,
        operation_id: Uuid,
    ) -> StorageResult<Option<OperationMetadata>> {
        // Project the metadata subtree so webhook lookups skip the turn history
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state->'metadata' FROM agent_operations WHERE operation_id = $1")
                .bind(operation_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((document,)) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(operation_id = %operation_id))]
    async fn delete(&self, operation_id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM agent_operations WHERE operation_id = $1")
            .bind(operation_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
