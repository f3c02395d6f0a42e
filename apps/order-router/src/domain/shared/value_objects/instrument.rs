//! Instrument value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A tradeable instrument, identified by its normalised symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    /// Create a new Instrument.
    ///
    /// The symbol is normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the symbol is usable for routing.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol is empty or contains whitespace.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidInstrument {
                symbol: self.0.clone(),
                reason: "is empty",
            });
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidInstrument {
                symbol: self.0.clone(),
                reason: "contains whitespace",
            });
        }
        Ok(())
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Instrument {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
