//! Point-in-time view of one venue's liquidity.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::shared::{Instrument, Money, Quantity, Timestamp, VenueId};

/// Per-venue market snapshot supplied by the market data port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Venue the snapshot describes.
    pub venue: VenueId,
    /// Instrument.
    pub instrument: Instrument,
    /// Best executable price on the side being routed.
    pub best_price: Money,
    /// Quantity available at or near the best price.
    pub available_depth: Quantity,
    /// When the snapshot was taken.
    pub timestamp: Timestamp,
}

impl MarketSnapshot {
    /// Create a snapshot stamped now.
    #[must_use]
    pub fn new(
        venue: VenueId,
        instrument: Instrument,
        best_price: Money,
        available_depth: Quantity,
    ) -> Self {
        Self {
            venue,
            instrument,
            best_price,
            available_depth,
            timestamp: Timestamp::now(),
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub const fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns true if the snapshot is older than `max_age` at `now`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration, now: Timestamp) -> bool {
        self.timestamp.age(now) > max_age
    }

    /// Returns true if there is anything to trade.
    #[must_use]
    pub fn has_liquidity(&self) -> bool {
        self.available_depth.is_positive()
    }
}
