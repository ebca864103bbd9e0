//! Postgres step lock.
//!
//! A single upsert decides the claim: the insert wins when no row exists, the
//! conflict update wins only when the existing lease has expired. Rows affected
//! tells the caller which side it landed on, no read-then-write window.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{LockResult, StepLock};

/// Table-backed [`StepLock`] safe across processes and hosts.
#[derive(Debug, Clone)]
pub struct PostgresStepLock {
    pool: PgPool,
}

impl PostgresStepLock {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the lease table when it does not exist yet.
    pub async fn ensure_schema(&self) -> LockResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_step_locks (
                operation_id UUID NOT NULL,
                step_index BIGINT NOT NULL,
                claimed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (operation_id, step_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("agent_step_locks table ready");
        Ok(())
    }
}

#[async_trait]
impl StepLock for PostgresStepLock {
    #[instrument(skip(self), fields(operation_id = %operation_id, step_index = step_index))]
    async fn try_claim(
        &self,
        operation_id: Uuid,
        step_index: u32,
        ttl: Duration,
    ) -> LockResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO agent_step_locks (operation_id, step_index, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            ON CONFLICT (operation_id, step_index)
            DO UPDATE SET
                expires_at = NOW() + make_interval(secs => $3),
                claimed_at = NOW()
            WHERE agent_step_locks.expires_at <= NOW()
            "#,
        )
        .bind(operation_id)
        .bind(step_index as i64)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() == 1;
        if claimed {
            debug!(ttl_secs = ttl.as_secs_f64(), "step lock claimed");
        } else {
            debug!("step lock held elsewhere");
        }
        Ok(claimed)
    }

    #[instrument(skip(self), fields(operation_id = %operation_id, step_index = step_index))]
    async fn release(&self, operation_id: Uuid, step_index: u32) -> LockResult<()> {
        let result = sqlx::query(
            "DELETE FROM agent_step_locks WHERE operation_id = $1 AND step_index = $2",
        )
        .bind(operation_id)
        .bind(step_index as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Expired-and-stolen leases land here; worth a trace but not an error
            warn!("release found no lease row");
        }
        Ok(())
    }
}
