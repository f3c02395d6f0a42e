//! In-memory market data for tests and paper routing.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::domain::routing::MarketSnapshot;
use crate::domain::shared::{Instrument, Money, Quantity, Timestamp, VenueId};

/// Market data held in process memory.
///
/// Snapshots are keyed by venue and instrument. Setting an outage makes
/// every query fail with [`MarketDataError::Unavailable`].
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    venues: RwLock<BTreeSet<VenueId>>,
    snapshots: RwLock<BTreeMap<(VenueId, Instrument), MarketSnapshot>>,
    outage: RwLock<Option<String>>,
}

impl InMemoryMarketData {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue without quotes.
    pub fn add_venue(&self, venue: VenueId) {
        self.venues.write().insert(venue);
    }

    /// Remove a venue and all its snapshots.
    pub fn remove_venue(&self, venue: &VenueId) {
        self.venues.write().remove(venue);
        self.snapshots.write().retain(|(v, _), _| v != venue);
    }

    /// Insert or replace a snapshot, registering its venue.
    pub fn upsert(&self, snapshot: MarketSnapshot) {
        self.venues.write().insert(snapshot.venue.clone());
        self.snapshots.write().insert(
            (snapshot.venue.clone(), snapshot.instrument.clone()),
            snapshot,
        );
    }

    /// Shorthand for [`upsert`](Self::upsert) with a fresh timestamp.
    pub fn quote(
        &self,
        venue: impl Into<VenueId>,
        instrument: impl Into<Instrument>,
        price: Money,
        depth: impl Into<Quantity>,
    ) {
        self.upsert(MarketSnapshot::new(
            venue.into(),
            instrument.into(),
            price,
            depth.into(),
        ));
    }

    /// Reduce a venue's displayed depth, as if liquidity was taken. Restamps the snapshot.
    pub fn consume(&self, venue: &VenueId, instrument: &Instrument, quantity: Quantity) {
        let mut snapshots = self.snapshots.write();
        if let Some(snapshot) = snapshots.get_mut(&(venue.clone(), instrument.clone())) {
            snapshot.available_depth = snapshot.available_depth.saturating_sub(quantity);
            snapshot.timestamp = Timestamp::now();
        }
    }

    /// Simulate a provider outage. `None` restores service.
    pub fn set_outage(&self, message: Option<String>) {
        *self.outage.write() = message;
    }

    fn check_available(&self) -> Result<(), MarketDataError> {
        match self.outage.read().as_ref() {
            Some(message) => Err(MarketDataError::Unavailable {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketDataPort for InMemoryMarketData {
    async fn available_venues(&self) -> Result<BTreeSet<VenueId>, MarketDataError> {
        self.check_available()?;
        Ok(self.venues.read().clone())
    }

    async fn snapshots(
        &self,
        instrument: &Instrument,
        venues: &BTreeSet<VenueId>,
    ) -> Result<Vec<MarketSnapshot>, MarketDataError> {
        self.check_available()?;
        let snapshots = self.snapshots.read();
        Ok(venues
            .iter()
            .filter_map(|venue| snapshots.get(&(venue.clone(), instrument.clone())))
            .cloned()
            .collect())
    }
}
