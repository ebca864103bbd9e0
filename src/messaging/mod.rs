//! # Messaging Module
//!
//! PostgreSQL message queue (pgmq) based scheduling for the step pipeline. Every
//! "run step N" request becomes a [`StepMessage`] on a queue; deliveries are
//! at-least-once, so the coordinator's lock and stale-retry guards make
//! redeliveries harmless.
//!
//! The producer side ([`WorkQueue`]) and consumer side ([`QueueConsumer`]) are
//! separate traits: the coordinator only schedules, the worker only consumes.

pub mod errors;
pub mod memory;
pub mod message;
#[cfg(feature = "postgres")]
pub mod pgmq_queue;
pub mod worker;

use async_trait::async_trait;
use std::time::Duration;

pub use errors::{MessagingError, MessagingResult};
pub use memory::InMemoryWorkQueue;
pub use message::{MessagePriority, ScheduleRequest, StepMessage, StepMessageMetadata};
#[cfg(feature = "postgres")]
pub use pgmq_queue::PgmqWorkQueue;
pub use worker::{QueueWorker, WorkerConfig};

/// Producer seam: schedule a step for future delivery.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue the request and return the backend's message id.
    async fn schedule(&self, request: ScheduleRequest) -> MessagingResult<i64>;
}

/// One delivery pulled off a queue. The payload stays raw JSON so the worker
/// can archive undecodable messages instead of crashing on them.
#[derive(Debug, Clone)]
pub struct QueuedDelivery {
    pub message_id: i64,
    pub payload: serde_json::Value,
    /// How many times this message has been read, including this delivery.
    pub delivery_count: u32,
}

/// Consumer seam: read, acknowledge, and archive deliveries.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Read up to `limit` messages, making them invisible for `visibility_timeout`.
    async fn read_batch(
        &self,
        endpoint: &str,
        visibility_timeout: Duration,
        limit: usize,
    ) -> MessagingResult<Vec<QueuedDelivery>>;

    /// Remove a handled message from the queue.
    async fn acknowledge(&self, endpoint: &str, message_id: i64) -> MessagingResult<()>;

    /// Move a poisoned or exhausted message to the archive.
    async fn archive(&self, endpoint: &str, message_id: i64) -> MessagingResult<()>;
}
