//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing routing events to external systems.

use async_trait::async_trait;

use crate::domain::routing::RoutingEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Connection error.
    #[error("Event publish connection error: {message}")]
    ConnectionError { message: String },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError { message: String },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed { message: String },
}

/// Port for publishing routing events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish routing events in order.
    async fn publish_routing_events(&self, events: Vec<RoutingEvent>)
    -> Result<(), EventPublishError>;

    /// Publish a single routing event.
    async fn publish_routing_event(&self, event: RoutingEvent) -> Result<(), EventPublishError> {
        self.publish_routing_events(vec![event]).await
    }
}

/// No-op event publisher.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_routing_events(
        &self,
        _events: Vec<RoutingEvent>,
    ) -> Result<(), EventPublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::Side;
    use crate::domain::shared::{Instrument, InstructionId, Quantity, Timestamp};

    #[tokio::test]
    async fn no_op_publisher_succeeds() {
        let publisher = NoOpEventPublisher;

        let event = RoutingEvent::InstructionAccepted {
            instruction_id: InstructionId::new("ins-1"),
            instrument: Instrument::new("AAPL"),
            side: Side::Buy,
            quantity: Quantity::from_i64(100),
            occurred_at: Timestamp::now(),
        };

        let result = publisher.publish_routing_event(event).await;
        assert!(result.is_ok());
    }
}
