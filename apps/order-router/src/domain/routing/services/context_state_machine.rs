//! Context State Machine Service
//!
//! Validates execution context lifecycle transitions.

use crate::domain::routing::errors::RoutingError;
use crate::domain::routing::value_objects::ContextStatus;

/// Transition table for [`ContextStatus`].
pub struct ContextStateMachine;

impl ContextStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: ContextStatus, to: ContextStatus) -> bool {
        matches!(
            (from, to),
            // From Pending
            (ContextStatus::Pending, ContextStatus::Active)
                | (ContextStatus::Pending, ContextStatus::Failed)
                // From Active
                | (ContextStatus::Active, ContextStatus::AwaitingRetry)
                | (ContextStatus::Active, ContextStatus::Completed)
                | (ContextStatus::Active, ContextStatus::Failed)
                // From AwaitingRetry
                | (ContextStatus::AwaitingRetry, ContextStatus::Active)
                | (ContextStatus::AwaitingRetry, ContextStatus::Failed)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidTransition`] if the table has no such edge.
    pub fn validate_transition(from: ContextStatus, to: ContextStatus) -> Result<(), RoutingError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(RoutingError::InvalidTransition { from, to })
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: ContextStatus) -> Vec<ContextStatus> {
        match from {
            ContextStatus::Pending => vec![ContextStatus::Active, ContextStatus::Failed],
            ContextStatus::Active => vec![
                ContextStatus::AwaitingRetry,
                ContextStatus::Completed,
                ContextStatus::Failed,
            ],
            ContextStatus::AwaitingRetry => vec![ContextStatus::Active, ContextStatus::Failed],
            // Terminal states
            ContextStatus::Completed | ContextStatus::Failed => vec![],
        }
    }
}
