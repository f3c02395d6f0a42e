//! Read-only view of an execution context handed to the sweep solver.

use std::collections::BTreeSet;

use super::{InvestorInstruction, Order};
use crate::domain::shared::{CorrelationId, Money, Quantity, VenueId, WaveId};

/// Everything a solver needs to build the next wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepRequest {
    /// Correlation key every order of the wave must carry.
    pub correlation: CorrelationId,
    /// The parent instruction.
    pub instruction: InvestorInstruction,
    /// Quantity still to be routed.
    pub remaining: Quantity,
    /// Venues that failed an order in an earlier wave.
    pub failed_venues: BTreeSet<VenueId>,
}

impl SweepRequest {
    /// Wave being solved.
    #[must_use]
    pub const fn wave(&self) -> WaveId {
        self.correlation.wave
    }

    /// Build a correlated child order for `venue`.
    #[must_use]
    pub fn child_order(&self, venue: VenueId, quantity: Quantity, price: Option<Money>) -> Order {
        Order::new(
            self.correlation.clone(),
            venue,
            self.instruction.instrument().clone(),
            self.instruction.side(),
            quantity,
            price.or(self.instruction.limit_price()),
        )
    }
}
