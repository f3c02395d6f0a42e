//! Child orders and the basket produced by one sweep.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Side;
use crate::domain::shared::{CorrelationId, Instrument, InstructionId, Money, OrderId, Quantity, VenueId};

/// One child order destined for a single venue.
///
/// Immutable once dispatched. The correlation id is the back-reference to the
/// originating instruction and wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    correlation: CorrelationId,
    venue: VenueId,
    instrument: Instrument,
    side: Side,
    quantity: Quantity,
    limit_price: Option<Money>,
}

impl Order {
    /// Create a child order with a generated id.
    #[must_use]
    pub fn new(
        correlation: CorrelationId,
        venue: VenueId,
        instrument: Instrument,
        side: Side,
        quantity: Quantity,
        limit_price: Option<Money>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            correlation,
            venue,
            instrument,
            side,
            quantity,
            limit_price,
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    /// Order id.
    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Correlation key (instruction + wave).
    #[must_use]
    pub fn correlation(&self) -> &CorrelationId {
        &self.correlation
    }

    /// Originating instruction.
    #[must_use]
    pub fn instruction_id(&self) -> &InstructionId {
        &self.correlation.instruction_id
    }

    /// Destination venue.
    #[must_use]
    pub fn venue(&self) -> &VenueId {
        &self.venue
    }

    /// Instrument.
    #[must_use]
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Side.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Order quantity.
    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Price constraint.
    #[must_use]
    pub fn limit_price(&self) -> Option<Money> {
        self.limit_price
    }
}

/// Ordered collection of child orders produced by one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBasket {
    correlation: CorrelationId,
    orders: Vec<Order>,
}

impl OrderBasket {
    /// Create an empty basket for a wave.
    #[must_use]
    pub const fn new(correlation: CorrelationId) -> Self {
        Self {
            correlation,
            orders: Vec::new(),
        }
    }

    /// Create a basket from pre-built orders.
    #[must_use]
    pub const fn with_orders(correlation: CorrelationId, orders: Vec<Order>) -> Self {
        Self {
            correlation,
            orders,
        }
    }

    /// Append an order.
    pub fn push(&mut self, order: Order) {
        self.orders.push(order);
    }

    /// Wave correlation this basket belongs to.
    #[must_use]
    pub fn correlation(&self) -> &CorrelationId {
        &self.correlation
    }

    /// The orders, in dispatch order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Iterate over orders.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Number of orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns true if the basket holds no orders ("no route available now").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of child order quantities.
    #[must_use]
    pub fn total_quantity(&self) -> Quantity {
        self.orders.iter().map(Order::quantity).sum()
    }

    /// Distinct venues targeted by this basket.
    #[must_use]
    pub fn venues(&self) -> BTreeSet<VenueId> {
        self.orders.iter().map(|o| o.venue.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a OrderBasket {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
