//! Routing Bounded Context
//!
//! Owns the execution lifecycle of one investor instruction routed across
//! several venues.
//!
//! # Key Concepts
//!
//! - **Execution Context**: per-instruction aggregate tracking cumulative fills,
//!   the outstanding wave and retry eligibility; sole source of terminal callbacks
//! - **Wave**: one solve-and-dispatch cycle for the currently remaining quantity
//! - **Correlation**: every child order carries `instruction id + wave`, so
//!   notifications are attributed without per-call handler installation
//! - **Retry Policy**: injected strategy deciding whether another wave is allowed

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{ApplyOutcome, ExecutionContext, TerminalCallbacks};
pub use errors::RoutingError;
pub use events::RoutingEvent;
pub use services::{BackoffRetryPolicy, ContextStateMachine, NoRetryPolicy, RetryPolicy};
pub use value_objects::{
    ContextStatus, ExecutionNotification, ExecutionReport, FailureReason, InvestorInstruction,
    MarketSnapshot, Order, OrderBasket, RoutingOutcome, Side, SweepRequest, VenueFailure,
    VenueFill, VenueNotification,
};
