//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of state transitions
//! - **Domain Services**: Stateless business logic and injected policies
//!
//! # Bounded Contexts
//!
//! - [`routing`]: Instruction execution lifecycle, wave reconciliation and retries

pub mod routing;
pub mod shared;
