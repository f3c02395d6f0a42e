//! Routing Value Objects
//!
//! Immutable types exchanged between the engine, the solver and venues.

mod failure;
mod instruction;
mod notification;
mod order;
mod outcome;
mod snapshot;
mod status;
mod sweep;

pub use failure::{FailureReason, VenueFailure};
pub use instruction::{InvestorInstruction, Side};
pub use notification::{ExecutionNotification, VenueNotification};
pub use order::{Order, OrderBasket};
pub use outcome::{ExecutionReport, RoutingOutcome, VenueFill};
pub use snapshot::MarketSnapshot;
pub use status::ContextStatus;
pub use sweep::SweepRequest;
