//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for market data, the sweep solver, venues and event sinks
//! - **Services**: The process-wide notification dispatcher
//! - **Use Cases**: The routing engine

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
