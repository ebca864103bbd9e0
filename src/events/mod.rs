pub mod publisher;
pub mod stream;

// Re-export key types for convenience
pub use publisher::{EventPublisher, PublishError, PublishedEvent};
pub use stream::OperationEvent;
