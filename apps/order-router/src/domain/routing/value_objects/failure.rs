//! Business failure reasons surfaced to the investor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::{Quantity, VenueId};

/// Failure reported by a venue for one child order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueFailure {
    /// Venue-specific rejection code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether re-routing the quantity may succeed.
    pub retryable: bool,
}

impl VenueFailure {
    /// A transient failure (timeout, throttling, liquidity moved away).
    #[must_use]
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent failure (invalid instrument, account restriction).
    #[must_use]
    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

/// Why an instruction could not be (fully) executed.
///
/// These are business outcomes delivered through the failure callback; they
/// never propagate as raised errors past the routing engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The solver found no venue able to take the remaining quantity.
    #[error("no liquidity available for remaining quantity {remaining}")]
    NoLiquidity {
        /// Quantity still unfilled.
        remaining: Quantity,
    },

    /// A venue rejected or failed a child order.
    #[error("venue {venue} failed order: [{}] {}", .failure.code, .failure.message)]
    VenueRejected {
        /// Venue that reported the failure.
        venue: VenueId,
        /// Failure details.
        failure: VenueFailure,
    },

    /// A wave settled with every order reported but quantity still open.
    #[error("wave settled with {remaining} unfilled")]
    InsufficientFill {
        /// Quantity still unfilled.
        remaining: Quantity,
    },

    /// The basket could not be handed to the venue layer.
    #[error("dispatch failed: {message}")]
    DispatchFailed {
        /// Error details.
        message: String,
    },

    /// Market data could not be loaded for the sweep.
    #[error("market data unavailable: {message}")]
    MarketDataUnavailable {
        /// Error details.
        message: String,
    },

    /// The retry policy refused another wave.
    #[error("retries exhausted after {attempts} waves; last failure: {last}")]
    RetriesExhausted {
        /// Waves dispatched.
        attempts: u32,
        /// Failure that triggered the final decision.
        last: Box<FailureReason>,
    },

    /// The instruction deadline elapsed before a terminal state.
    #[error("instruction timed out with {remaining} unfilled")]
    TimedOut {
        /// Quantity still unfilled.
        remaining: Quantity,
    },

    /// The caller cancelled routing.
    #[error("routing cancelled with {remaining} unfilled")]
    Cancelled {
        /// Quantity still unfilled.
        remaining: Quantity,
    },

    /// An internal invariant was violated; see the accompanying `RoutingError`.
    #[error("internal error: {message}")]
    Internal {
        /// Error details.
        message: String,
    },
}

impl FailureReason {
    /// Returns true if another wave may recover from this failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::VenueRejected { failure, .. } => failure.retryable,
            Self::InsufficientFill { .. } | Self::DispatchFailed { .. } => true,
            Self::NoLiquidity { .. }
            | Self::MarketDataUnavailable { .. }
            | Self::RetriesExhausted { .. }
            | Self::TimedOut { .. }
            | Self::Cancelled { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Short machine-readable label, used for metrics and events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoLiquidity { .. } => "no_liquidity",
            Self::VenueRejected { .. } => "venue_rejected",
            Self::InsufficientFill { .. } => "insufficient_fill",
            Self::DispatchFailed { .. } => "dispatch_failed",
            Self::MarketDataUnavailable { .. } => "market_data_unavailable",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
            Self::Internal { .. } => "internal",
        }
    }
}
