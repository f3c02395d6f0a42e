//! Sweep Solver Port (Driven Port)
//!
//! Allocation strategy that splits the remaining quantity into a basket.

use crate::domain::routing::{MarketSnapshot, OrderBasket, SweepRequest};

/// Produces the next wave of child orders.
///
/// Implementations must be pure with respect to the request and return a
/// basket correlated with `request.correlation` whose total quantity does not
/// exceed `request.remaining`. An empty basket means no route is available
/// now; the engine treats it as a terminal no-liquidity failure.
pub trait SweepSolver: Send + Sync {
    /// Solve one wave.
    fn solve(&self, request: &SweepRequest, snapshots: &[MarketSnapshot]) -> OrderBasket;
}
