//! Paper-routing simulation: venues, quotes and instructions to route.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::routing::{InvestorInstruction, Side, VenueFailure};
use crate::domain::shared::{DomainError, Instrument, InstructionId, Money, Quantity, VenueId};
use crate::infrastructure::VenueBehaviour;

/// Simulation configuration used by the binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationConfig {
    /// Delay before each venue report (milliseconds).
    #[serde(default)]
    pub latency_ms: u64,
    /// Random extra delay per report (milliseconds).
    #[serde(default)]
    pub jitter_ms: u64,
    /// Simulated venues.
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
    /// Instructions routed at startup.
    #[serde(default)]
    pub instructions: Vec<InstructionConfig>,
}

/// One simulated venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue identifier.
    pub id: String,
    /// Standing behaviour.
    #[serde(default)]
    pub behaviour: BehaviourConfig,
    /// One-shot behaviours consumed before the standing one.
    #[serde(default)]
    pub script: Vec<BehaviourConfig>,
    /// Displayed liquidity.
    #[serde(default)]
    pub quotes: Vec<QuoteConfig>,
}

impl VenueConfig {
    /// Venue identifier.
    #[must_use]
    pub fn venue_id(&self) -> VenueId {
        VenueId::new(self.id.clone())
    }
}

/// How a simulated venue answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviourConfig {
    /// Execute every order in full.
    #[default]
    FillAll,
    /// Execute a fixed quantity.
    FillPartial {
        /// Quantity reported per order.
        quantity: Decimal,
    },
    /// Execute a share of each order, never more than the order.
    FillFraction {
        /// Share of the order quantity, in `(0, 1]`.
        fraction: Decimal,
    },
    /// Fail every order.
    Reject {
        /// Rejection code.
        code: String,
        /// Rejection message.
        message: String,
        /// Whether re-routing may succeed.
        #[serde(default)]
        retryable: bool,
    },
    /// Never report.
    Silent,
}

impl BehaviourConfig {
    /// Convert to the venue adapter's behaviour.
    #[must_use]
    pub fn to_behaviour(&self) -> VenueBehaviour {
        match self {
            Self::FillAll => VenueBehaviour::FillAll,
            Self::FillPartial { quantity } => VenueBehaviour::FillPartial(Quantity::new(*quantity)),
            Self::FillFraction { fraction } => VenueBehaviour::FillFraction(*fraction),
            Self::Reject {
                code,
                message,
                retryable,
            } => VenueBehaviour::Reject(VenueFailure {
                code: code.clone(),
                message: message.clone(),
                retryable: *retryable,
            }),
            Self::Silent => VenueBehaviour::Silent,
        }
    }
}

/// Displayed liquidity for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Instrument symbol.
    pub instrument: String,
    /// Best price.
    pub price: Decimal,
    /// Available depth.
    pub depth: Decimal,
}

impl QuoteConfig {
    /// Instrument.
    #[must_use]
    pub fn instrument(&self) -> Instrument {
        Instrument::new(self.instrument.clone())
    }

    /// Best price.
    #[must_use]
    pub const fn price(&self) -> Money {
        Money::new(self.price)
    }

    /// Available depth.
    #[must_use]
    pub const fn depth(&self) -> Quantity {
        Quantity::new(self.depth)
    }
}

/// An instruction to route at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionConfig {
    /// Caller-supplied id. Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Instrument symbol.
    pub instrument: String,
    /// Side.
    pub side: Side,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price. Absent routes at any price.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
}

impl InstructionConfig {
    /// Build and validate the instruction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the quantity, symbol or limit is invalid.
    pub fn to_instruction(&self) -> Result<InvestorInstruction, DomainError> {
        let id = self
            .id
            .as_ref()
            .map_or_else(InstructionId::generate, |id| InstructionId::new(id.clone()));
        InvestorInstruction::new(
            id,
            Instrument::new(self.instrument.clone()),
            self.side,
            Quantity::new(self.quantity),
            self.limit_price.map(Money::new),
        )
    }
}
