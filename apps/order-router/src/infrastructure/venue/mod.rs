//! Venue adapters.

mod simulated;

pub use simulated::{SimulatedVenue, VenueBehaviour};
