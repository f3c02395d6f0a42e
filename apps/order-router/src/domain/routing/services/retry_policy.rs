//! Retry policies deciding whether another sweep wave may be dispatched.
//!
//! The execution context asks the injected policy after every wave that
//! settles short of full execution. Every re-solve wave counts as one retry.
//!
//! | Retried | Never retried |
//! |---------|---------------|
//! | Retryable venue rejection (timeout, throttling) | Permanent venue rejection |
//! | Wave settled with residual quantity | No liquidity, market data unavailable |
//! | Basket dispatch failure | Timeout, cancellation, internal error |

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::routing::value_objects::FailureReason;

/// Injected strategy consulted by `ExecutionContext::should_continue`.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Whether another wave may be dispatched after `retries_so_far` retries,
    /// given the failure that settled the last wave.
    fn allows(&self, retries_so_far: u32, last_failure: Option<&FailureReason>) -> bool;

    /// Delay before dispatching retry number `retry` (1-based).
    fn backoff(&self, retry: u32) -> Duration;
}

/// Exponential backoff with jitter and a bounded retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffRetryPolicy {
    /// Maximum number of retry waves after the first (default: 3).
    pub max_retries: u32,
    /// Backoff before the first retry (default: 50ms).
    pub initial_backoff: Duration,
    /// Upper bound for any backoff (default: 2s).
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for BackoffRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl BackoffRetryPolicy {
    /// Create a new retry policy with custom settings.
    #[must_use]
    pub const fn new(
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
            jitter_factor,
        }
    }

    /// Create an aggressive retry policy (more waves, shorter backoff).
    #[must_use]
    pub const fn aggressive() -> Self {
        Self {
            max_retries: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            backoff_multiplier: 1.5,
            jitter_factor: 0.1,
        }
    }

    /// Create a conservative retry policy (fewer waves, longer backoff).
    #[must_use]
    pub const fn conservative() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 3.0,
            jitter_factor: 0.3,
        }
    }

    /// Immediate retries with no delay, used by tests and paper routing.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Calculate base exponential backoff without jitter.
    fn base_backoff_ms(&self, retry: u32) -> u64 {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_multiplier.powi(exponent);
        let backoff = (self.initial_backoff.as_millis() as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms())
    }

    /// Apply jitter in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if backoff_ms == 0 || self.jitter_factor <= 0.0 {
            return backoff_ms;
        }

        let mut rng = rand::rng();
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;

        rng.random_range(min..=max) as u64
    }

    fn max_backoff_ms(&self) -> u64 {
        self.max_backoff.as_millis() as u64
    }
}

impl RetryPolicy for BackoffRetryPolicy {
    fn allows(&self, retries_so_far: u32, last_failure: Option<&FailureReason>) -> bool {
        retries_so_far < self.max_retries && last_failure.is_none_or(FailureReason::is_retryable)
    }

    fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_backoff_ms(retry);
        let jittered = self.apply_jitter(base).min(self.max_backoff_ms());
        Duration::from_millis(jittered)
    }
}

/// Never dispatches a second wave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn allows(&self, _retries_so_far: u32, _last_failure: Option<&FailureReason>) -> bool {
        false
    }

    fn backoff(&self, _retry: u32) -> Duration {
        Duration::ZERO
    }
}
