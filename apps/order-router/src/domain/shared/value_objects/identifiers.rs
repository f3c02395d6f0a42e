//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts, and carry the
//! correlation key that ties a venue notification back to its instruction.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(InstructionId, "Unique identifier for an investor instruction.");
define_id!(OrderId, "Unique identifier for a child order.");
define_id!(VenueId, "Identifier for an execution venue.");

/// Sequence number of a sweep wave within one instruction (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveId(u32);

impl WaveId {
    /// The first wave of an instruction.
    pub const FIRST: Self = Self(1);

    /// Create a wave id from its sequence number.
    #[must_use]
    pub const fn new(sequence: u32) -> Self {
        Self(sequence)
    }

    /// Get the sequence number.
    #[must_use]
    pub const fn sequence(self) -> u32 {
        self.0
    }

    /// The wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Correlation key stamped on every dispatched child order.
///
/// Venue notifications echo it back so the dispatcher can find the owning
/// execution context without any per-call handler installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId {
    /// Instruction that owns the order.
    pub instruction_id: InstructionId,
    /// Wave the order was dispatched in.
    pub wave: WaveId,
}

impl CorrelationId {
    /// Create a correlation id.
    #[must_use]
    pub const fn new(instruction_id: InstructionId, wave: WaveId) -> Self {
        Self {
            instruction_id,
            wave,
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instruction_id, self.wave)
    }
}
