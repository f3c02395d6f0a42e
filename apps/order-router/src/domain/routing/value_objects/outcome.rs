//! Terminal outcomes delivered to the investor.

use serde::{Deserialize, Serialize};

use super::FailureReason;
use crate::domain::shared::{InstructionId, Quantity, VenueId};

/// Quantity executed at one venue over the instruction's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueFill {
    /// Venue.
    pub venue: VenueId,
    /// Cumulative executed quantity at this venue.
    pub quantity: Quantity,
}

/// Payload of the success callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Instruction identifier.
    pub instruction_id: InstructionId,
    /// Final cumulative executed quantity (equals the requested quantity).
    pub executed_quantity: Quantity,
    /// Number of waves dispatched.
    pub waves: u32,
    /// Per-venue breakdown, ordered by venue id.
    pub fills: Vec<VenueFill>,
}

/// Exactly one of these is produced per routed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingOutcome {
    /// Fully executed.
    Completed(ExecutionReport),
    /// Abandoned.
    Failed {
        /// Instruction identifier.
        instruction_id: InstructionId,
        /// Why routing stopped.
        reason: FailureReason,
    },
}

impl RoutingOutcome {
    /// Returns true for a fully executed instruction.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Instruction identifier.
    #[must_use]
    pub const fn instruction_id(&self) -> &InstructionId {
        match self {
            Self::Completed(report) => &report.instruction_id,
            Self::Failed { instruction_id, .. } => instruction_id,
        }
    }

    /// The execution report, if completed.
    #[must_use]
    pub const fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    /// The failure reason, if failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { reason, .. } => Some(reason),
        }
    }
}
