//! Terminal callbacks owned by an execution context.

use std::fmt;

use crate::domain::routing::value_objects::{ExecutionReport, FailureReason};

type SuccessCallback = Box<dyn FnOnce(ExecutionReport) + Send>;
type FailureCallback = Box<dyn FnOnce(FailureReason) + Send>;

/// The investor's `on_success` / `on_failure` pair.
///
/// Consuming `self` on either path means at most one callback can ever run.
pub struct TerminalCallbacks {
    on_success: SuccessCallback,
    on_failure: FailureCallback,
}

impl TerminalCallbacks {
    /// Wrap a success and a failure callback.
    pub fn new<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(ExecutionReport) + Send + 'static,
        F: FnOnce(FailureReason) + Send + 'static,
    {
        Self {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        }
    }

    /// Callbacks that do nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }

    pub(crate) fn succeed(self, report: ExecutionReport) {
        (self.on_success)(report);
    }

    pub(crate) fn fail(self, reason: FailureReason) {
        (self.on_failure)(reason);
    }
}

impl fmt::Debug for TerminalCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalCallbacks").finish_non_exhaustive()
    }
}
