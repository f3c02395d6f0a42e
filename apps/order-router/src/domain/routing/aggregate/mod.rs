//! Execution Context Aggregate
//!
//! Per-instruction state: cumulative fills, the outstanding wave and retry
//! eligibility. It is the only place that fires terminal callbacks.

mod callbacks;
mod execution_context;

pub use callbacks::TerminalCallbacks;
pub use execution_context::{ApplyOutcome, ExecutionContext};
