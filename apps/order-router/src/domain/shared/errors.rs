//! Value object validation errors.

use std::fmt;

use rust_decimal::Decimal;

/// Rejected input when building instructions, quantities or prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A quantity field was zero or negative.
    NonPositiveQuantity {
        /// Field the quantity was supplied for.
        field: String,
        /// Offending value.
        value: Decimal,
    },

    /// A price was zero or negative.
    NonPositivePrice {
        /// Offending value.
        value: Decimal,
    },

    /// The instrument symbol cannot be routed.
    InvalidInstrument {
        /// Symbol as supplied.
        symbol: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveQuantity { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            Self::NonPositivePrice { value } => write!(f, "price must be positive, got {value}"),
            Self::InvalidInstrument { symbol, reason } => {
                write!(f, "instrument '{symbol}' {reason}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
