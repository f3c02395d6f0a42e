//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `solver/`: sweep solvers turning market snapshots into order baskets
//! - `market_data/`: market data providers
//! - `venue/`: venue adapters that accept baskets and emit notifications
//! - `events/`: audit event publishers
//!
//! The adapters shipped here are in-process. They back the paper-routing
//! binary and the integration tests; live venue connectivity plugs in
//! behind the same ports.

pub mod events;
pub mod market_data;
pub mod solver;
pub mod venue;

pub use events::{RecordingEventPublisher, TracingEventPublisher};
pub use market_data::InMemoryMarketData;
pub use solver::{GreedySolverSettings, GreedySweepSolver};
pub use venue::{SimulatedVenue, VenueBehaviour};
