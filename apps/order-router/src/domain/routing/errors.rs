//! Routing errors.
//!
//! These are programmer/correlation errors, distinct from the business
//! outcomes in [`FailureReason`](super::FailureReason). A `RoutingError`
//! means fills were misattributed, a wave was double-dispatched or the
//! caller misused the engine.

use thiserror::Error;

use super::value_objects::ContextStatus;
use crate::domain::shared::{CorrelationId, DomainError, InstructionId, OrderId, WaveId};

/// Errors raised by the execution context, the dispatcher and the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// A quantity or correlation invariant was broken.
    #[error("invariant violation on instruction {instruction_id}: {message}")]
    InvariantViolation {
        /// Instruction whose context detected the violation.
        instruction_id: InstructionId,
        /// Description of the broken invariant.
        message: String,
    },

    /// The context already delivered its terminal callback.
    #[error("instruction {instruction_id} is already terminal ({status})")]
    AlreadyTerminal {
        /// Instruction identifier.
        instruction_id: InstructionId,
        /// Terminal status reached earlier.
        status: ContextStatus,
    },

    /// A lifecycle transition outside the state machine was attempted.
    #[error("invalid context transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ContextStatus,
        /// Requested status.
        to: ContextStatus,
    },

    /// A notification referenced a wave other than the outstanding one.
    #[error("stale notification {correlation}: outstanding wave is {outstanding}")]
    StaleWave {
        /// Correlation carried by the notification.
        correlation: CorrelationId,
        /// Wave currently outstanding.
        outstanding: WaveId,
    },

    /// A notification referenced an order that is not outstanding.
    #[error("order {order_id} is not outstanding for {correlation}")]
    UnknownOrder {
        /// Correlation carried by the notification.
        correlation: CorrelationId,
        /// Order identifier.
        order_id: OrderId,
    },

    /// The instruction id is already being routed.
    #[error("instruction {0} is already in flight")]
    DuplicateInstruction(InstructionId),

    /// The instruction failed domain validation.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(#[from] DomainError),
}

impl RoutingError {
    /// Returns true for errors that indicate corrupted fill accounting.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Short label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StaleWave { .. } => "stale_wave",
            Self::UnknownOrder { .. } => "unknown_order",
            Self::DuplicateInstruction(_) => "duplicate_instruction",
            Self::InvalidInstruction(_) => "invalid_instruction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violation_display() {
        let err = RoutingError::InvariantViolation {
            instruction_id: InstructionId::new("ins-1"),
            message: "executed 120 exceeds quantity 100".to_string(),
        };
        assert!(err.to_string().contains("ins-1"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn stale_wave_display() {
        let err = RoutingError::StaleWave {
            correlation: CorrelationId::new(InstructionId::new("ins-1"), WaveId::FIRST),
            outstanding: WaveId::new(2),
        };
        assert_eq!(
            err.to_string(),
            "stale notification ins-1/w1: outstanding wave is w2"
        );
        assert!(!err.is_invariant_violation());
    }

    #[test]
    fn domain_error_converts() {
        let err: RoutingError = DomainError::NonPositivePrice {
            value: rust_decimal::Decimal::ZERO,
        }
        .into();
        assert_eq!(err.label(), "invalid_instruction");
    }
}
