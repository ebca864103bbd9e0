//! In-memory work queue for tests and single-process embedding.
//!
//! Mirrors pgmq semantics closely enough to exercise the pipeline: delayed
//! visibility, visibility timeout on read, redelivery counting, and an archive
//! for poisoned messages. Higher-priority messages are delivered first among
//! the currently visible ones, which pgmq itself does not do.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use super::errors::MessagingResult;
use super::message::{MessagePriority, ScheduleRequest, StepMessage};
use super::{QueueConsumer, QueuedDelivery, WorkQueue};

#[derive(Debug, Clone)]
struct QueuedEntry {
    message_id: i64,
    payload: Value,
    priority: MessagePriority,
    visible_at: Instant,
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<QueuedEntry>,
    archived: Vec<QueuedEntry>,
}

/// Map-backed [`WorkQueue`] + [`QueueConsumer`].
#[derive(Debug, Default)]
pub struct InMemoryWorkQueue {
    queues: Mutex<HashMap<String, QueueState>>,
    next_id: AtomicI64,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Decoded pending messages on a queue, in insertion order. Test helper.
    pub fn pending_messages(&self, endpoint: &str) -> Vec<StepMessage> {
        let queues = self.queues.lock();
        queues
            .get(endpoint)
            .map(|state| {
                state
                    .pending
                    .iter()
                    .filter_map(|entry| StepMessage::from_json(entry.payload.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of pending messages on a queue.
    pub fn pending_len(&self, endpoint: &str) -> usize {
        self.queues
            .lock()
            .get(endpoint)
            .map(|state| state.pending.len())
            .unwrap_or(0)
    }

    /// Number of archived messages on a queue.
    pub fn archived_len(&self, endpoint: &str) -> usize {
        self.queues
            .lock()
            .get(endpoint)
            .map(|state| state.archived.len())
            .unwrap_or(0)
    }

    /// Make every pending message visible immediately. Lets tests force
    /// redelivery without sleeping through delays or visibility timeouts.
    pub fn make_all_visible(&self, endpoint: &str) {
        let now = Instant::now();
        if let Some(state) = self.queues.lock().get_mut(endpoint) {
            for entry in &mut state.pending {
                entry.visible_at = now;
            }
        }
    }

    /// Drop every pending message on a queue. Test helper.
    pub fn clear(&self, endpoint: &str) {
        if let Some(state) = self.queues.lock().get_mut(endpoint) {
            state.pending.clear();
        }
    }

    /// Push a raw JSON payload, bypassing `StepMessage` encoding. Lets tests
    /// exercise the worker's poisoned-message path.
    pub fn push_raw(&self, endpoint: &str, payload: Value) -> i64 {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut queues = self.queues.lock();
        queues.entry(endpoint.to_string()).or_default().pending.push(QueuedEntry {
            message_id,
            payload,
            priority: MessagePriority::Normal,
            visible_at: Instant::now(),
            delivery_count: 0,
        });
        message_id
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn schedule(&self, request: ScheduleRequest) -> MessagingResult<i64> {
        let message = StepMessage::from_request(&request);
        let payload = message.to_json()?;
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let mut queues = self.queues.lock();
        queues
            .entry(request.endpoint.clone())
            .or_default()
            .pending
            .push(QueuedEntry {
                message_id,
                payload,
                priority: request.priority,
                visible_at: Instant::now() + request.delay,
                delivery_count: 0,
            });

        Ok(message_id)
    }
}

#[async_trait]
impl QueueConsumer for InMemoryWorkQueue {
    async fn read_batch(
        &self,
        endpoint: &str,
        visibility_timeout: Duration,
        limit: usize,
    ) -> MessagingResult<Vec<QueuedDelivery>> {
        let now = Instant::now();
        let mut queues = self.queues.lock();
        let Some(state) = queues.get_mut(endpoint) else {
            return Ok(Vec::new());
        };

        let mut visible: Vec<&mut QueuedEntry> = state
            .pending
            .iter_mut()
            .filter(|entry| entry.visible_at <= now)
            .collect();
        // Priority first, then longest-waiting
        visible.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.visible_at.cmp(&b.visible_at)));

        let mut deliveries = Vec::new();
        for entry in visible.into_iter().take(limit) {
            entry.delivery_count += 1;
            entry.visible_at = now + visibility_timeout;
            deliveries.push(QueuedDelivery {
                message_id: entry.message_id,
                payload: entry.payload.clone(),
                delivery_count: entry.delivery_count,
            });
        }
        Ok(deliveries)
    }

    async fn acknowledge(&self, endpoint: &str, message_id: i64) -> MessagingResult<()> {
        let mut queues = self.queues.lock();
        if let Some(state) = queues.get_mut(endpoint) {
            state.pending.retain(|entry| entry.message_id != message_id);
        }
        Ok(())
    }

    async fn archive(&self, endpoint: &str, message_id: i64) -> MessagingResult<()> {
        let mut queues = self.queues.lock();
        if let Some(state) = queues.get_mut(endpoint) {
            if let Some(pos) = state
                .pending
                .iter()
                .position(|entry| entry.message_id == message_id)
            {
                let entry = state.pending.remove(pos);
                state.archived.push(entry);
            }
        }
        Ok(())
    }
}
