//! Routing Domain Services

mod context_state_machine;
mod retry_policy;

pub use context_state_machine::ContextStateMachine;
pub use retry_policy::{BackoffRetryPolicy, NoRetryPolicy, RetryPolicy};
