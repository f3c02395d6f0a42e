//! Routing engine and retry configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::use_cases::EngineConfig;
use crate::domain::routing::{BackoffRetryPolicy, NoRetryPolicy, RetryPolicy};

/// Routing engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Deadline per instruction in milliseconds. Absent or zero waits forever.
    #[serde(default = "default_instruction_timeout_ms")]
    pub instruction_timeout_ms: Option<u64>,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            instruction_timeout_ms: default_instruction_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl RoutingConfig {
    /// Convert to the engine's settings.
    #[must_use]
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            instruction_timeout: self
                .instruction_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }
}

/// Retry strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Exponential backoff with jitter.
    Backoff,
    /// Never retry.
    None,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Strategy.
    #[serde(default = "default_strategy")]
    pub strategy: RetryStrategy,
    /// Maximum retry waves after the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any retry delay (milliseconds).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Random spread applied to each delay, 0.0 to 1.0.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// Build the configured policy.
    #[must_use]
    pub fn to_policy(&self) -> Arc<dyn RetryPolicy> {
        match self.strategy {
            RetryStrategy::Backoff => Arc::new(BackoffRetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
                self.backoff_multiplier,
                self.jitter_factor,
            )),
            RetryStrategy::None => Arc::new(NoRetryPolicy),
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
const fn default_instruction_timeout_ms() -> Option<u64> {
    Some(30_000)
}

const fn default_strategy() -> RetryStrategy {
    RetryStrategy::Backoff
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    50
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}
