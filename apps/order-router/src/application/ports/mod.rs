//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! The routing core consumes market data, a sweep solver and a venue layer,
//! and publishes audit events.

mod event_publisher_port;
mod market_data_port;
mod sweep_solver_port;
mod venue_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use market_data_port::{MarketDataError, MarketDataPort};
pub use sweep_solver_port::SweepSolver;
pub use venue_port::{NotificationSink, VenueError, VenuePort};
