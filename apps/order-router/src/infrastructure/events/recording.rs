//! Event publisher that keeps everything it receives.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::routing::RoutingEvent;
use crate::domain::shared::InstructionId;

/// Collects published events in memory for inspection.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RoutingEvent>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    #[must_use]
    pub fn events(&self) -> Vec<RoutingEvent> {
        self.events.lock().clone()
    }

    /// Events belonging to one instruction.
    #[must_use]
    pub fn events_for(&self, instruction_id: &InstructionId) -> Vec<RoutingEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.instruction_id() == instruction_id)
            .cloned()
            .collect()
    }

    /// Event type names in publication order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RoutingEvent::event_type).collect()
    }

    /// Number of events published.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventPublisherPort for RecordingEventPublisher {
    async fn publish_routing_events(
        &self,
        events: Vec<RoutingEvent>,
    ) -> Result<(), EventPublishError> {
        self.events.lock().extend(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::Side;
    use crate::domain::shared::{Instrument, Quantity, Timestamp};

    fn accepted(id: &str) -> RoutingEvent {
        RoutingEvent::InstructionAccepted {
            instruction_id: InstructionId::new(id),
            instrument: Instrument::new("AAPL"),
            side: Side::Buy,
            quantity: Quantity::from_i64(100),
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn records_in_order() {
        let publisher = RecordingEventPublisher::new();

        publisher
            .publish_routing_events(vec![accepted("ins-1"), accepted("ins-2")])
            .await
            .unwrap();
        publisher.publish_routing_event(accepted("ins-1")).await.unwrap();

        assert_eq!(publisher.len(), 3);
        assert_eq!(publisher.events_for(&InstructionId::new("ins-1")).len(), 2);
        assert_eq!(publisher.event_types(), vec!["INSTRUCTION_ACCEPTED"; 3]);
    }

    #[tokio::test]
    async fn clear_empties_recorder() {
        let publisher = RecordingEventPublisher::new();
        publisher.publish_routing_event(accepted("ins-1")).await.unwrap();

        publisher.clear();

        assert!(publisher.is_empty());
    }
}
