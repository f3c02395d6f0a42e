//! Sweep solver configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Quantity;
use crate::infrastructure::GreedySolverSettings;

/// Greedy sweep solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Ignore snapshots older than this (milliseconds). Absent accepts any age.
    #[serde(default = "default_max_snapshot_age_ms")]
    pub max_snapshot_age_ms: Option<u64>,
    /// Maximum venues per wave.
    #[serde(default = "default_max_venues")]
    pub max_venues: usize,
    /// Smallest child order worth sending.
    #[serde(default = "default_min_child_quantity")]
    pub min_child_quantity: Decimal,
    /// Skip venues that failed in an earlier wave.
    #[serde(default = "default_true")]
    pub exclude_failed_venues: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_snapshot_age_ms: default_max_snapshot_age_ms(),
            max_venues: default_max_venues(),
            min_child_quantity: default_min_child_quantity(),
            exclude_failed_venues: true,
        }
    }
}

impl SolverConfig {
    /// Convert to the solver's settings.
    #[must_use]
    pub fn to_settings(&self) -> GreedySolverSettings {
        GreedySolverSettings {
            max_snapshot_age: self.max_snapshot_age_ms.map(Duration::from_millis),
            max_venues: self.max_venues,
            min_child_quantity: Quantity::new(self.min_child_quantity),
            exclude_failed_venues: self.exclude_failed_venues,
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_snapshot_age_ms() -> Option<u64> {
    Some(5_000)
}

const fn default_max_venues() -> usize {
    8
}

const fn default_min_child_quantity() -> Decimal {
    Decimal::ONE
}

pub(super) const fn default_true() -> bool {
    true
}
