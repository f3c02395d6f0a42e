// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Router - Instruction Execution Core
//!
//! Splits an investor instruction into waves of child orders across
//! venues, attributes asynchronous venue reports back to the instruction,
//! retries failed waves under an injected policy and delivers exactly one
//! terminal outcome per instruction.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `routing`: `ExecutionContext` aggregate, lifecycle state machine,
//!     retry policies, routing events
//!   - `shared`: identifiers, quantities, prices, timestamps
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `MarketDataPort`, `SweepSolver`, `VenuePort`, `NotificationSink`,
//!     `EventPublisherPort`
//!   - `services`: `NotificationDispatcher` correlating reports to contexts
//!   - `use_cases`: `RoutingEngine`
//!
//! - **Infrastructure**: Adapters
//!   - `solver`: greedy price-priority sweep
//!   - `market_data`: in-memory snapshots
//!   - `venue`: simulated venue
//!   - `events`: recording and log-stream publishers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Prometheus metrics.
pub mod observability;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::{NotificationDispatcher, RoutingEngine};
pub use domain::routing::{
    ExecutionReport, FailureReason, InvestorInstruction, RoutingError, RoutingOutcome, Side,
};
