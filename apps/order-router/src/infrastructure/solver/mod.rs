//! Sweep solver adapters.

mod greedy;

pub use greedy::{GreedySolverSettings, GreedySweepSolver};
