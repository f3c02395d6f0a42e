//! Application Use Cases

mod route_instruction;

pub use route_instruction::{EngineConfig, RoutingEngine};
