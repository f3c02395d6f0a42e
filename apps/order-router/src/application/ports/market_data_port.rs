//! Market Data Port (Driven Port)
//!
//! Venue enumeration and per-venue snapshots consumed before every sweep.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::routing::MarketSnapshot;
use crate::domain::shared::{Instrument, VenueId};

/// Market data errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketDataError {
    /// The provider could not be reached.
    #[error("market data provider unavailable: {message}")]
    Unavailable { message: String },

    /// The provider does not know the instrument.
    #[error("unknown instrument: {instrument}")]
    UnknownInstrument { instrument: Instrument },
}

/// Port for venue enumeration and market snapshots.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Venues currently available for routing.
    async fn available_venues(&self) -> Result<BTreeSet<VenueId>, MarketDataError>;

    /// Current snapshots for `instrument` on each of `venues`.
    ///
    /// Venues without a snapshot are omitted from the result.
    async fn snapshots(
        &self,
        instrument: &Instrument,
        venues: &BTreeSet<VenueId>,
    ) -> Result<Vec<MarketSnapshot>, MarketDataError>;
}
