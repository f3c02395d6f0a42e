//! Investor instruction: the parent request being routed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{DomainError, Instrument, InstructionId, Money, Quantity, Timestamp};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy side: consumes offers, prefers lower prices.
    Buy,
    /// Sell side: consumes bids, prefers higher prices.
    Sell,
}

impl Side {
    /// Returns true if `price` satisfies `limit` for this side.
    #[must_use]
    pub fn within_limit(self, price: Money, limit: Money) -> bool {
        match self {
            Self::Buy => price <= limit,
            Self::Sell => price >= limit,
        }
    }

    /// Returns true if `a` is a better price than `b` for this side.
    #[must_use]
    pub fn is_better(self, a: Money, b: Money) -> bool {
        match self {
            Self::Buy => a < b,
            Self::Sell => a > b,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Immutable request from an investor to trade a quantity of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorInstruction {
    id: InstructionId,
    instrument: Instrument,
    side: Side,
    quantity: Quantity,
    limit_price: Option<Money>,
    created_at: Timestamp,
}

impl InvestorInstruction {
    /// Create a validated instruction.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive, the instrument symbol is
    /// malformed, or the limit price is not positive.
    pub fn new(
        id: InstructionId,
        instrument: Instrument,
        side: Side,
        quantity: Quantity,
        limit_price: Option<Money>,
    ) -> Result<Self, DomainError> {
        instrument.validate()?;
        quantity.validate_positive("quantity")?;
        if let Some(limit) = limit_price {
            limit.validate_as_price()?;
        }

        Ok(Self {
            id,
            instrument,
            side,
            quantity,
            limit_price,
            created_at: Timestamp::now(),
        })
    }

    /// Create an instruction without a price constraint and a generated id.
    ///
    /// # Errors
    ///
    /// Returns error if validation fails.
    pub fn market(
        instrument: impl Into<Instrument>,
        side: Side,
        quantity: impl Into<Quantity>,
    ) -> Result<Self, DomainError> {
        Self::new(
            InstructionId::generate(),
            instrument.into(),
            side,
            quantity.into(),
            None,
        )
    }

    /// Create a price-constrained instruction with a generated id.
    ///
    /// # Errors
    ///
    /// Returns error if validation fails.
    pub fn limit(
        instrument: impl Into<Instrument>,
        side: Side,
        quantity: impl Into<Quantity>,
        limit_price: Money,
    ) -> Result<Self, DomainError> {
        Self::new(
            InstructionId::generate(),
            instrument.into(),
            side,
            quantity.into(),
            Some(limit_price),
        )
    }

    /// Replace the generated id (callers that own their identifiers).
    #[must_use]
    pub fn with_id(mut self, id: InstructionId) -> Self {
        self.id = id;
        self
    }

    /// Instruction identifier.
    #[must_use]
    pub fn id(&self) -> &InstructionId {
        &self.id
    }

    /// Instrument to trade.
    #[must_use]
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Trade direction.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Total requested quantity.
    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Optional price constraint.
    #[must_use]
    pub fn limit_price(&self) -> Option<Money> {
        self.limit_price
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns true if a venue price satisfies the instruction's constraint.
    #[must_use]
    pub fn accepts_price(&self, price: Money) -> bool {
        self.limit_price
            .is_none_or(|limit| self.side.within_limit(price, limit))
    }
}
