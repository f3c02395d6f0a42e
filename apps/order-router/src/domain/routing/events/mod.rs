//! Domain events for instruction routing.
//!
//! The execution context accumulates these as it moves through its
//! lifecycle; the engine drains and publishes them.

use serde::{Deserialize, Serialize};

use super::value_objects::{ExecutionReport, FailureReason, Side, VenueFailure};
use crate::domain::shared::{
    CorrelationId, Instrument, InstructionId, OrderId, Quantity, Timestamp, VenueId,
};

/// All routing lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingEvent {
    /// Instruction accepted for routing.
    InstructionAccepted {
        /// Instruction identifier.
        instruction_id: InstructionId,
        /// Instrument.
        instrument: Instrument,
        /// Side.
        side: Side,
        /// Requested quantity.
        quantity: Quantity,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// A wave of child orders was handed to the venue layer.
    WaveDispatched {
        /// Wave correlation.
        correlation: CorrelationId,
        /// Number of child orders.
        orders: usize,
        /// Total routed quantity.
        quantity: Quantity,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// A child order executed.
    OrderExecuted {
        /// Wave correlation.
        correlation: CorrelationId,
        /// Child order.
        order_id: OrderId,
        /// Venue.
        venue: VenueId,
        /// Executed quantity.
        quantity: Quantity,
        /// Cumulative executed quantity of the instruction.
        cumulative_quantity: Quantity,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// A child order failed.
    OrderFailed {
        /// Wave correlation.
        correlation: CorrelationId,
        /// Child order.
        order_id: OrderId,
        /// Venue.
        venue: VenueId,
        /// Venue failure.
        failure: VenueFailure,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// Every order of a wave reported and quantity remains.
    WaveSettled {
        /// Wave correlation.
        correlation: CorrelationId,
        /// Quantity still unfilled.
        remaining: Quantity,
        /// Failure recorded for the wave.
        failure: FailureReason,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// A retry wave was scheduled.
    RetryScheduled {
        /// Instruction identifier.
        instruction_id: InstructionId,
        /// Retry number (1-based).
        retry: u32,
        /// Backoff before the retry, in milliseconds.
        delay_ms: u64,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// Instruction fully executed.
    InstructionCompleted {
        /// Execution report.
        report: ExecutionReport,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
    /// Instruction abandoned.
    InstructionFailed {
        /// Instruction identifier.
        instruction_id: InstructionId,
        /// Why routing stopped.
        reason: FailureReason,
        /// Quantity executed before failure.
        executed_quantity: Quantity,
        /// When the event occurred.
        occurred_at: Timestamp,
    },
}

impl RoutingEvent {
    /// Get the instruction ID for this event.
    #[must_use]
    pub const fn instruction_id(&self) -> &InstructionId {
        match self {
            Self::InstructionAccepted { instruction_id, .. }
            | Self::RetryScheduled { instruction_id, .. }
            | Self::InstructionFailed { instruction_id, .. } => instruction_id,
            Self::WaveDispatched { correlation, .. }
            | Self::OrderExecuted { correlation, .. }
            | Self::OrderFailed { correlation, .. }
            | Self::WaveSettled { correlation, .. } => &correlation.instruction_id,
            Self::InstructionCompleted { report, .. } => &report.instruction_id,
        }
    }

    /// Get the timestamp when this event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::InstructionAccepted { occurred_at, .. }
            | Self::WaveDispatched { occurred_at, .. }
            | Self::OrderExecuted { occurred_at, .. }
            | Self::OrderFailed { occurred_at, .. }
            | Self::WaveSettled { occurred_at, .. }
            | Self::RetryScheduled { occurred_at, .. }
            | Self::InstructionCompleted { occurred_at, .. }
            | Self::InstructionFailed { occurred_at, .. } => *occurred_at,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::InstructionAccepted { .. } => "INSTRUCTION_ACCEPTED",
            Self::WaveDispatched { .. } => "WAVE_DISPATCHED",
            Self::OrderExecuted { .. } => "ORDER_EXECUTED",
            Self::OrderFailed { .. } => "ORDER_FAILED",
            Self::WaveSettled { .. } => "WAVE_SETTLED",
            Self::RetryScheduled { .. } => "RETRY_SCHEDULED",
            Self::InstructionCompleted { .. } => "INSTRUCTION_COMPLETED",
            Self::InstructionFailed { .. } => "INSTRUCTION_FAILED",
        }
    }

    /// Returns true for the two terminal events.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InstructionCompleted { .. } | Self::InstructionFailed { .. }
        )
    }
}
