//! Asynchronous per-order notifications raised by the venue layer.

use serde::{Deserialize, Serialize};

use super::{Order, VenueFailure};
use crate::domain::shared::{CorrelationId, OrderId, Quantity, Timestamp, VenueId};

/// Terminal outcome of one child order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionNotification {
    /// The order executed `quantity` (possibly less than ordered).
    Executed {
        /// Executed quantity.
        quantity: Quantity,
    },
    /// The order failed without executing.
    Failed {
        /// Failure details.
        reason: VenueFailure,
    },
}

impl ExecutionNotification {
    /// Label for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Executed { .. } => "executed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A notification as delivered by the venue port, carrying the correlation
/// key echoed from the dispatched order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueNotification {
    /// Correlation key of the order.
    pub correlation: CorrelationId,
    /// Child order id.
    pub order_id: OrderId,
    /// Venue that raised the notification.
    pub venue: VenueId,
    /// The outcome.
    pub notification: ExecutionNotification,
    /// When the venue layer raised it.
    pub raised_at: Timestamp,
}

impl VenueNotification {
    /// Build an execution notification for a dispatched order.
    #[must_use]
    pub fn executed(order: &Order, quantity: Quantity) -> Self {
        Self::for_order(order, ExecutionNotification::Executed { quantity })
    }

    /// Build a failure notification for a dispatched order.
    #[must_use]
    pub fn failed(order: &Order, reason: VenueFailure) -> Self {
        Self::for_order(order, ExecutionNotification::Failed { reason })
    }

    fn for_order(order: &Order, notification: ExecutionNotification) -> Self {
        Self {
            correlation: order.correlation().clone(),
            order_id: order.id().clone(),
            venue: order.venue().clone(),
            notification,
            raised_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::Side;
    use crate::domain::shared::{Instrument, InstructionId, WaveId};

    fn order() -> Order {
        Order::new(
            CorrelationId::new(InstructionId::new("ins-1"), WaveId::FIRST),
            VenueId::new("V1"),
            Instrument::new("AAPL"),
            Side::Buy,
            Quantity::from_i64(10),
            None,
        )
    }

    #[test]
    fn executed_echoes_order_correlation() {
        let o = order();
        let n = VenueNotification::executed(&o, Quantity::from_i64(10));
        assert_eq!(&n.correlation, o.correlation());
        assert_eq!(&n.order_id, o.id());
        assert_eq!(n.notification.kind(), "executed");
    }

    #[test]
    fn failed_carries_reason() {
        let o = order();
        let n = VenueNotification::failed(&o, VenueFailure::retryable("BUSY", "throttled"));
        match n.notification {
            ExecutionNotification::Failed { reason } => assert_eq!(reason.code, "BUSY"),
            ExecutionNotification::Executed { .. } => panic!("expected failure"),
        }
    }
}
