//! Execution context lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an execution context.
///
/// `Pending → Active ⇄ AwaitingRetry → {Completed, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextStatus {
    /// Created, no wave dispatched yet.
    Pending,
    /// A wave is outstanding.
    Active,
    /// The last wave settled short of full execution; deciding whether to retry.
    AwaitingRetry,
    /// Fully executed. Terminal.
    Completed,
    /// Abandoned. Terminal.
    Failed,
}

impl ContextStatus {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if notifications are expected in this state.
    #[must_use]
    pub const fn accepts_notifications(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::AwaitingRetry => "AWAITING_RETRY",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}
