//! Broadcast publisher for the operation event stream.
//!
//! The stream is observability-only: slow or absent subscribers never block the
//! step pipeline, and publishing with no subscribers succeeds.

use serde_json::Value;
use tokio::sync::broadcast;

use super::stream::OperationEvent;

/// High-throughput event publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub async fn publish(
        &self,
        event_name: impl Into<String>,
        context: Value,
    ) -> Result<(), PublishError> {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // broadcast::send errors only when no subscriber exists, which is fine
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Publish a typed lifecycle record under its canonical event name.
    pub async fn publish_event(&self, event: OperationEvent) -> Result<(), PublishError> {
        let name = event.name();
        let context = serde_json::to_value(&event)?;
        self.publish(name, context).await
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let publisher = EventPublisher::new(8);
        publisher
            .publish("operation.step_started", json!({"step_index": 0}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher
            .publish("operation.created", json!({"auto_started": true}))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, "operation.created");
        assert_eq!(event.context["auto_started"], json!(true));
    }

    #[tokio::test]
    async fn test_typed_events_carry_canonical_names() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        let operation_id = Uuid::new_v4();

        publisher
            .publish_event(OperationEvent::step_started(operation_id, 3))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, crate::constants::events::STEP_STARTED);
        assert_eq!(event.context["operation_id"], json!(operation_id));
        assert_eq!(event.context["step_index"], json!(3));
    }
}
