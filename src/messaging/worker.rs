//! # Queue Worker
//!
//! Polling loop that turns queued step messages into coordinator calls.
//!
//! One worker handles one endpoint: read a batch, decode each delivery
//! into a [`StepMessage`], hand it to
//! [`RuntimeCoordinator::execute_step`], then acknowledge. Guard no-ops
//! (lock contention, stale retries, terminal operations) still count as
//! handled since the holder's own delivery drives progress. Execution
//! errors leave the message invisible until the visibility timeout
//! expires and the queue redelivers it; undecodable payloads and
//! messages past the delivery cap are archived.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, instrument, warn};

use crate::config::QueueSettings;
use crate::messaging::message::StepMessage;
use crate::messaging::{MessagingError, MessagingResult, QueueConsumer, QueuedDelivery};
use crate::orchestration::RuntimeCoordinator;

/// Polling configuration for one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue this worker drains.
    pub endpoint: String,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// Invisibility window granted per read.
    pub visibility_timeout: Duration,
    /// Messages read per poll.
    pub batch_size: usize,
    /// Deliveries allowed before a message is archived as poisoned.
    pub max_delivery_attempts: u32,
}

impl WorkerConfig {
    pub fn from_queue_settings(settings: &QueueSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            poll_interval: settings.poll_interval,
            visibility_timeout: settings.visibility_timeout,
            batch_size: settings.batch_size,
            max_delivery_attempts: settings.max_delivery_attempts,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_queue_settings(&QueueSettings::default())
    }
}

/// Drains one step queue into a [`RuntimeCoordinator`].
pub struct QueueWorker<Q: QueueConsumer> {
    queue: Arc<Q>,
    coordinator: Arc<RuntimeCoordinator>,
    config: WorkerConfig,
    running: AtomicBool,
    shutdown: Notify,
}

impl<Q: QueueConsumer> QueueWorker<Q> {
    pub fn new(queue: Arc<Q>, coordinator: Arc<RuntimeCoordinator>, config: WorkerConfig) -> Self {
        Self {
            queue,
            coordinator,
            config,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request a graceful stop. A sleeping worker wakes immediately; a
    /// worker mid-batch finishes the batch first.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.shutdown.notify_waiters();
    }

    /// Poll until [`stop`](Self::stop) is called.
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    pub async fn run(&self) -> MessagingResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(MessagingError::internal("queue worker is already running"));
        }

        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "🚀 Queue worker starting"
        );

        while self.running.load(Ordering::Acquire) {
            let deliveries = match self
                .queue
                .read_batch(
                    &self.config.endpoint,
                    self.config.visibility_timeout,
                    self.config.batch_size,
                )
                .await
            {
                Ok(deliveries) => deliveries,
                Err(queue_error) => {
                    error!(error = %queue_error, "Failed to read step queue");
                    if self.wait_or_shutdown(self.config.poll_interval).await {
                        break;
                    }
                    continue;
                }
            };

            if deliveries.is_empty() {
                if self.wait_or_shutdown(self.config.poll_interval).await {
                    break;
                }
                continue;
            }

            debug!(count = deliveries.len(), "📨 Processing step deliveries");
            for delivery in deliveries {
                self.process_delivery(delivery).await;
            }
        }

        self.running.store(false, Ordering::Release);
        info!("Queue worker stopped");
        Ok(())
    }

    /// Sleep for `duration` unless a shutdown arrives first. Returns true
    /// when the worker should exit.
    async fn wait_or_shutdown(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.running.load(Ordering::Acquire),
            _ = self.shutdown.notified() => true,
        }
    }

    async fn process_delivery(&self, delivery: QueuedDelivery) {
        let message_id = delivery.message_id;

        if delivery.delivery_count > self.config.max_delivery_attempts {
            warn!(
                message_id,
                delivery_count = delivery.delivery_count,
                max = self.config.max_delivery_attempts,
                "🗑️ Delivery attempts exhausted, archiving message"
            );
            self.archive(message_id).await;
            return;
        }

        let message: StepMessage = match serde_json::from_value(delivery.payload) {
            Ok(message) => message,
            Err(parse_error) => {
                warn!(
                    message_id,
                    error = %parse_error,
                    "🗑️ Undecodable step message, archiving"
                );
                self.archive(message_id).await;
                return;
            }
        };

        match self
            .coordinator
            .execute_step(
                message.operation_id,
                message.step_index,
                message.context,
                message.human_input,
            )
            .await
        {
            Ok(result) => {
                debug!(
                    message_id,
                    operation_id = %message.operation_id,
                    step_index = message.step_index,
                    locked = result.locked,
                    executed = result.executed(),
                    next_step_scheduled = result.next_step_scheduled,
                    "Step delivery handled"
                );
                if let Err(ack_error) = self
                    .queue
                    .acknowledge(&self.config.endpoint, message_id)
                    .await
                {
                    warn!(
                        message_id,
                        error = %ack_error,
                        "Failed to acknowledge handled message; it may redeliver"
                    );
                }
            }
            Err(step_error) => {
                // No acknowledgement: the visibility timeout expires and the
                // queue redelivers, up to the delivery cap.
                warn!(
                    message_id,
                    operation_id = %message.operation_id,
                    step_index = message.step_index,
                    error = %step_error,
                    "Step execution failed, leaving message for redelivery"
                );
            }
        }
    }

    async fn archive(&self, message_id: i64) {
        if let Err(archive_error) = self.queue.archive(&self.config.endpoint, message_id).await {
            warn!(
                message_id,
                error = %archive_error,
                "Failed to archive message"
            );
        }
    }
}
