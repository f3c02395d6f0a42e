//! Event publisher that writes events to the log stream.

use async_trait::async_trait;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::routing::RoutingEvent;

/// Emits each event as a JSON payload on the `order_router::audit` target.
///
/// Terminal events are logged at `info`, everything else at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    /// Create the publisher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisherPort for TracingEventPublisher {
    async fn publish_routing_events(
        &self,
        events: Vec<RoutingEvent>,
    ) -> Result<(), EventPublishError> {
        for event in events {
            let payload = serde_json::to_string(&event).map_err(|e| {
                EventPublishError::SerializationError {
                    message: e.to_string(),
                }
            })?;

            if event.is_terminal() {
                tracing::info!(
                    target: "order_router::audit",
                    instruction_id = %event.instruction_id(),
                    event_type = event.event_type(),
                    %payload,
                    "routing event"
                );
            } else {
                tracing::debug!(
                    target: "order_router::audit",
                    instruction_id = %event.instruction_id(),
                    event_type = event.event_type(),
                    %payload,
                    "routing event"
                );
            }
        }
        Ok(())
    }
}
