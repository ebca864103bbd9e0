//! # PostgreSQL Work Queue (pgmq-rs)
//!
//! pgmq-backed step queue. Scheduling uses `send`/`send_delay`; consumption
//! uses visibility-timeout batch reads, so unacknowledged deliveries reappear
//! on their own. pgmq delays are whole seconds, sub-second requests round up.

use pgmq::PGMQueue;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::{MessagingError, MessagingResult};
use super::message::{ScheduleRequest, StepMessage};
use super::{QueueConsumer, QueuedDelivery, WorkQueue};
use async_trait::async_trait;

/// pgmq-rs based work queue
#[derive(Debug, Clone)]
pub struct PgmqWorkQueue {
    pgmq: PGMQueue,
}

impl PgmqWorkQueue {
    /// Create new pgmq work queue using a connection string
    pub async fn new(database_url: &str) -> MessagingResult<Self> {
        info!("🚀 Connecting to pgmq using pgmq-rs crate");

        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;

        info!("✅ Connected to pgmq using pgmq-rs");
        Ok(Self { pgmq })
    }

    /// Create new pgmq work queue using an existing connection pool
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        info!("🚀 Creating pgmq work queue with shared connection pool");

        let pgmq = PGMQueue::new_with_pool(pool).await;

        info!("✅ pgmq work queue created with shared pool");
        Self { pgmq }
    }

    /// Create queue if it doesn't exist
    pub async fn create_queue(&self, queue_name: &str) -> MessagingResult<()> {
        debug!("📋 Creating queue: {}", queue_name);

        self.pgmq.create(queue_name).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "create", e.to_string())
        })?;

        info!("✅ Queue created: {}", queue_name);
        Ok(())
    }

    /// Purge queue (delete all messages)
    pub async fn purge_queue(&self, queue_name: &str) -> MessagingResult<u64> {
        warn!("🧹 Purging queue: {}", queue_name);

        let purged_count = self.pgmq.purge(queue_name).await.map_err(|e| {
            MessagingError::queue_operation(queue_name, "purge", e.to_string())
        })?;

        warn!("🗑️ Purged {} messages from queue: {}", purged_count, queue_name);
        Ok(purged_count)
    }

    fn delay_seconds(delay: Duration) -> u64 {
        if delay.is_zero() {
            0
        } else {
            // Round sub-second delays up, pgmq cannot express them
            delay.as_millis().div_ceil(1000) as u64
        }
    }
}

#[async_trait]
impl WorkQueue for PgmqWorkQueue {
    async fn schedule(&self, request: ScheduleRequest) -> MessagingResult<i64> {
        let endpoint = request.endpoint.clone();
        let message = StepMessage::from_request(&request);
        let delay_seconds = Self::delay_seconds(request.delay);

        debug!(
            "📤 Scheduling step {} of operation {} on queue: {} (delay: {}s)",
            message.step_index, message.operation_id, endpoint, delay_seconds
        );

        let message_id = if delay_seconds == 0 {
            self.pgmq.send(&endpoint, &message).await
        } else {
            self.pgmq.send_delay(&endpoint, &message, delay_seconds).await
        }
        .map_err(|e| MessagingError::queue_operation(&endpoint, "send", e.to_string()))?;

        debug!("✅ Step message sent to queue: {} with id: {}", endpoint, message_id);
        Ok(message_id)
    }
}

#[async_trait]
impl QueueConsumer for PgmqWorkQueue {
    async fn read_batch(
        &self,
        endpoint: &str,
        visibility_timeout: Duration,
        limit: usize,
    ) -> MessagingResult<Vec<QueuedDelivery>> {
        let vt = visibility_timeout.as_secs().max(1) as i32;

        let messages = self
            .pgmq
            .read_batch::<serde_json::Value>(endpoint, Some(vt), limit as i32)
            .await
            .map_err(|e| MessagingError::queue_operation(endpoint, "read_batch", e.to_string()))?
            .unwrap_or_default();

        debug!("📨 Read {} messages from queue: {}", messages.len(), endpoint);

        Ok(messages
            .into_iter()
            .map(|m| QueuedDelivery {
                message_id: m.msg_id,
                payload: m.message,
                delivery_count: m.read_ct.max(0) as u32,
            })
            .collect())
    }

    async fn acknowledge(&self, endpoint: &str, message_id: i64) -> MessagingResult<()> {
        debug!("🗑️ Deleting message {} from queue: {}", message_id, endpoint);

        self.pgmq.delete(endpoint, message_id).await.map_err(|e| {
            MessagingError::queue_operation(endpoint, "delete", e.to_string())
        })?;

        Ok(())
    }

    async fn archive(&self, endpoint: &str, message_id: i64) -> MessagingResult<()> {
        debug!("📦 Archiving message {} from queue: {}", message_id, endpoint);

        self.pgmq.archive(endpoint, message_id).await.map_err(|e| {
            MessagingError::queue_operation(endpoint, "archive", e.to_string())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_rounding() {
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::ZERO), 0);
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::from_millis(1)), 1);
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::from_millis(999)), 1);
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::from_millis(1000)), 1);
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::from_millis(1001)), 2);
        assert_eq!(PgmqWorkQueue::delay_seconds(Duration::from_secs(30)), 30);
    }
}
