//! Execution Context Aggregate Root
//!
//! Tracks one instruction across its sweep waves. All mutation goes through
//! `&mut self`, so the caller holding the context behind a mutex gets atomic
//! read-modify-write of the executed quantity, the outstanding orders and
//! the terminal flag, and the terminal callback runs under that same lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::TerminalCallbacks;
use crate::domain::routing::errors::RoutingError;
use crate::domain::routing::events::RoutingEvent;
use crate::domain::routing::services::{ContextStateMachine, RetryPolicy};
use crate::domain::routing::value_objects::{
    ContextStatus, ExecutionNotification, ExecutionReport, FailureReason, InvestorInstruction,
    OrderBasket, SweepRequest, VenueFailure, VenueFill, VenueNotification,
};
use crate::domain::shared::{CorrelationId, OrderId, Quantity, Timestamp, VenueId, WaveId};

/// What applying a notification did to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Recorded; other orders of the wave are still outstanding.
    Pending,
    /// Every order of the wave reported and quantity remains.
    WaveSettled,
    /// The instruction is fully executed and the success callback fired.
    Completed,
}

#[derive(Debug, Clone)]
struct OutstandingOrder {
    venue: VenueId,
    quantity: Quantity,
}

/// Execution context for one investor instruction.
///
/// Invariant: `0 <= executed <= instruction.quantity()`. Exactly one of the
/// terminal callbacks runs, at most once.
#[derive(Debug)]
pub struct ExecutionContext {
    instruction: InvestorInstruction,
    status: ContextStatus,
    executed: Quantity,
    wave: Option<WaveId>,
    retries: u32,
    outstanding: HashMap<OrderId, OutstandingOrder>,
    wave_failure: Option<FailureReason>,
    last_failure: Option<FailureReason>,
    terminal_failure: Option<FailureReason>,
    failed_venues: BTreeSet<VenueId>,
    fills: BTreeMap<VenueId, Quantity>,
    retry_policy: Arc<dyn RetryPolicy>,
    callbacks: Option<TerminalCallbacks>,
    events: Vec<RoutingEvent>,
}

impl ExecutionContext {
    /// Create a context in `Pending`.
    pub fn new(
        instruction: InvestorInstruction,
        retry_policy: Arc<dyn RetryPolicy>,
        callbacks: TerminalCallbacks,
    ) -> Self {
        let accepted = RoutingEvent::InstructionAccepted {
            instruction_id: instruction.id().clone(),
            instrument: instruction.instrument().clone(),
            side: instruction.side(),
            quantity: instruction.quantity(),
            occurred_at: Timestamp::now(),
        };

        Self {
            instruction,
            status: ContextStatus::Pending,
            executed: Quantity::ZERO,
            wave: None,
            retries: 0,
            outstanding: HashMap::new(),
            wave_failure: None,
            last_failure: None,
            terminal_failure: None,
            failed_venues: BTreeSet::new(),
            fills: BTreeMap::new(),
            retry_policy,
            callbacks: Some(callbacks),
            events: vec![accepted],
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// The instruction being routed.
    #[must_use]
    pub const fn instruction(&self) -> &InvestorInstruction {
        &self.instruction
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ContextStatus {
        self.status
    }

    /// Returns true once a terminal callback has fired.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Cumulative executed quantity.
    #[must_use]
    pub const fn executed_quantity(&self) -> Quantity {
        self.executed
    }

    /// `instruction.quantity - executed`.
    #[must_use]
    pub fn remaining_quantity(&self) -> Quantity {
        self.instruction.quantity().saturating_sub(self.executed)
    }

    /// The most recently dispatched wave.
    #[must_use]
    pub const fn current_wave(&self) -> Option<WaveId> {
        self.wave
    }

    /// Number of waves dispatched so far.
    #[must_use]
    pub fn waves_dispatched(&self) -> u32 {
        self.wave.map_or(0, WaveId::sequence)
    }

    /// Number of retry waves scheduled so far.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Orders of the current wave that have not reported yet.
    #[must_use]
    pub fn outstanding_orders(&self) -> usize {
        self.outstanding.len()
    }

    /// Venues that failed an order in any wave.
    #[must_use]
    pub const fn failed_venues(&self) -> &BTreeSet<VenueId> {
        &self.failed_venues
    }

    /// Failure that settled the most recent short wave.
    #[must_use]
    pub const fn last_failure(&self) -> Option<&FailureReason> {
        self.last_failure.as_ref()
    }

    /// Reason passed to the failure callback, once failed.
    #[must_use]
    pub const fn terminal_failure(&self) -> Option<&FailureReason> {
        self.terminal_failure.as_ref()
    }

    /// Correlation the next wave must carry.
    #[must_use]
    pub fn next_correlation(&self) -> CorrelationId {
        let wave = self.wave.map_or(WaveId::FIRST, WaveId::next);
        CorrelationId::new(self.instruction.id().clone(), wave)
    }

    /// Read-only view handed to the sweep solver.
    #[must_use]
    pub fn sweep_request(&self) -> SweepRequest {
        SweepRequest {
            correlation: self.next_correlation(),
            instruction: self.instruction.clone(),
            remaining: self.remaining_quantity(),
            failed_venues: self.failed_venues.clone(),
        }
    }

    /// Current execution report.
    #[must_use]
    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            instruction_id: self.instruction.id().clone(),
            executed_quantity: self.executed,
            waves: self.waves_dispatched(),
            fills: self
                .fills
                .iter()
                .map(|(venue, quantity)| VenueFill {
                    venue: venue.clone(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    // ========================================================================
    // Wave lifecycle
    // ========================================================================

    /// Register a validated basket as the outstanding wave.
    ///
    /// Must be called before the basket is handed to the venue layer so that
    /// notifications racing the dispatch call are attributed.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` for an empty basket, a foreign or
    /// out-of-sequence correlation, a non-positive child quantity or a basket
    /// larger than the remaining quantity. Returns `AlreadyTerminal` /
    /// `InvalidTransition` if the context is not between waves.
    pub fn begin_wave(&mut self, basket: &OrderBasket) -> Result<(), RoutingError> {
        self.ensure_not_terminal()?;
        ContextStateMachine::validate_transition(self.status, ContextStatus::Active)?;
        self.validate_basket(basket)?;

        let correlation = basket.correlation().clone();
        self.outstanding = basket
            .iter()
            .map(|order| {
                (
                    order.id().clone(),
                    OutstandingOrder {
                        venue: order.venue().clone(),
                        quantity: order.quantity(),
                    },
                )
            })
            .collect();
        self.wave = Some(correlation.wave);
        self.wave_failure = None;
        self.status = ContextStatus::Active;

        self.events.push(RoutingEvent::WaveDispatched {
            correlation,
            orders: basket.len(),
            quantity: basket.total_quantity(),
            occurred_at: Timestamp::now(),
        });
        Ok(())
    }

    /// Abandon the outstanding wave after the venue layer refused the basket.
    ///
    /// Orders of the wave are forgotten; late notifications for them are
    /// rejected as stale once the next wave begins.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless a wave is outstanding.
    pub fn abandon_wave(&mut self, reason: FailureReason) -> Result<(), RoutingError> {
        self.ensure_not_terminal()?;
        ContextStateMachine::validate_transition(self.status, ContextStatus::AwaitingRetry)?;
        self.outstanding.clear();
        self.wave_failure = Some(reason);
        self.settle_wave();
        Ok(())
    }

    /// Record that a retry wave is about to be solved and return its backoff.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the previous wave has settled.
    pub fn begin_retry(&mut self) -> Result<Duration, RoutingError> {
        self.ensure_not_terminal()?;
        if self.status != ContextStatus::AwaitingRetry {
            return Err(RoutingError::InvalidTransition {
                from: self.status,
                to: ContextStatus::Active,
            });
        }

        self.retries += 1;
        let delay = self.retry_policy.backoff(self.retries);
        self.events.push(RoutingEvent::RetryScheduled {
            instruction_id: self.instruction.id().clone(),
            retry: self.retries,
            delay_ms: delay.as_millis() as u64,
            occurred_at: Timestamp::now(),
        });
        Ok(delay)
    }

    /// Whether another wave may be dispatched: quantity remains, the context
    /// is not terminal and the retry policy allows it.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        !self.is_terminal()
            && self.remaining_quantity().is_positive()
            && self
                .retry_policy
                .allows(self.retries, self.last_failure.as_ref())
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Apply a correlated venue notification.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` for a foreign instruction or over-execution,
    /// `AlreadyTerminal` after a terminal callback, `StaleWave` for a wave
    /// other than the outstanding one and `UnknownOrder` for an order that
    /// is not outstanding. None of these change the executed quantity.
    pub fn apply(&mut self, notification: &VenueNotification) -> Result<ApplyOutcome, RoutingError> {
        if &notification.correlation.instruction_id != self.instruction.id() {
            return Err(self.violation(format!(
                "notification for {} delivered to this context",
                notification.correlation
            )));
        }
        self.ensure_not_terminal()?;

        let outstanding_wave = self.wave.unwrap_or(WaveId::FIRST);
        if self.status != ContextStatus::Active
            || notification.correlation.wave != outstanding_wave
        {
            return Err(RoutingError::StaleWave {
                correlation: notification.correlation.clone(),
                outstanding: outstanding_wave,
            });
        }

        match &notification.notification {
            ExecutionNotification::Executed { quantity } => {
                self.record_execution(&notification.order_id, *quantity)
            }
            ExecutionNotification::Failed { reason } => {
                self.record_failure(&notification.order_id, reason.clone())
            }
        }
    }

    /// Add `quantity` executed by an outstanding order.
    ///
    /// Declares success once the executed quantity reaches the instruction's
    /// quantity. Execution below the order quantity leaves residual that is
    /// re-routed on the next wave.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if `quantity` exceeds the order's quantity or
    /// would push the cumulative total past the instruction's quantity. No
    /// clamping is applied.
    pub fn record_execution(
        &mut self,
        order_id: &OrderId,
        quantity: Quantity,
    ) -> Result<ApplyOutcome, RoutingError> {
        self.ensure_not_terminal()?;
        let order = self.outstanding_order(order_id)?;

        if quantity < Quantity::ZERO {
            return Err(self.violation(format!("order {order_id} executed negative {quantity}")));
        }
        if quantity > order.quantity {
            return Err(self.violation(format!(
                "order {order_id} executed {quantity} of {}",
                order.quantity
            )));
        }
        let cumulative = self.executed + quantity;
        if cumulative > self.instruction.quantity() {
            return Err(self.violation(format!(
                "executed quantity {cumulative} would exceed instruction quantity {}",
                self.instruction.quantity()
            )));
        }

        self.outstanding.remove(order_id);
        self.executed = cumulative;
        if quantity.is_positive() {
            let fill = self.fills.entry(order.venue.clone()).or_insert(Quantity::ZERO);
            *fill = *fill + quantity;
        }
        let correlation = self.next_correlation_for_current();
        self.events.push(RoutingEvent::OrderExecuted {
            correlation,
            order_id: order_id.clone(),
            venue: order.venue,
            quantity,
            cumulative_quantity: cumulative,
            occurred_at: Timestamp::now(),
        });

        if self.executed == self.instruction.quantity() {
            self.declare_success()?;
            return Ok(ApplyOutcome::Completed);
        }
        Ok(self.settle_if_drained())
    }

    /// Record that an outstanding order failed without executing.
    ///
    /// # Errors
    ///
    /// `AlreadyTerminal` or `UnknownOrder`.
    pub fn record_failure(
        &mut self,
        order_id: &OrderId,
        failure: VenueFailure,
    ) -> Result<ApplyOutcome, RoutingError> {
        self.ensure_not_terminal()?;
        let order = self.outstanding_order(order_id)?;
        self.outstanding.remove(order_id);
        self.failed_venues.insert(order.venue.clone());

        let reason = FailureReason::VenueRejected {
            venue: order.venue.clone(),
            failure: failure.clone(),
        };
        // A permanent rejection outranks a transient one within the wave.
        let replace = self
            .wave_failure
            .as_ref()
            .is_none_or(|existing| existing.is_retryable() && !reason.is_retryable());
        if replace {
            self.wave_failure = Some(reason);
        }

        let correlation = self.next_correlation_for_current();
        self.events.push(RoutingEvent::OrderFailed {
            correlation,
            order_id: order_id.clone(),
            venue: order.venue,
            failure,
            occurred_at: Timestamp::now(),
        });

        Ok(self.settle_if_drained())
    }

    // ========================================================================
    // Terminal transitions
    // ========================================================================

    /// Mark the context failed and fire the failure callback.
    ///
    /// # Errors
    ///
    /// `AlreadyTerminal` if a terminal callback already fired; the callback
    /// is not re-invoked.
    pub fn declare_failure(&mut self, reason: FailureReason) -> Result<(), RoutingError> {
        self.ensure_not_terminal()?;
        ContextStateMachine::validate_transition(self.status, ContextStatus::Failed)?;

        self.status = ContextStatus::Failed;
        self.outstanding.clear();
        self.terminal_failure = Some(reason.clone());
        self.events.push(RoutingEvent::InstructionFailed {
            instruction_id: self.instruction.id().clone(),
            reason: reason.clone(),
            executed_quantity: self.executed,
            occurred_at: Timestamp::now(),
        });

        if let Some(callbacks) = self.callbacks.take() {
            callbacks.fail(reason);
        }
        Ok(())
    }

    /// Mark the context completed and fire the success callback.
    ///
    /// # Errors
    ///
    /// `AlreadyTerminal`, or `InvariantViolation` if the executed quantity
    /// does not equal the instruction's quantity.
    pub fn declare_success(&mut self) -> Result<(), RoutingError> {
        self.ensure_not_terminal()?;
        if self.executed != self.instruction.quantity() {
            return Err(self.violation(format!(
                "success declared at {} of {}",
                self.executed,
                self.instruction.quantity()
            )));
        }
        ContextStateMachine::validate_transition(self.status, ContextStatus::Completed)?;

        self.status = ContextStatus::Completed;
        self.outstanding.clear();
        let report = self.report();
        self.events.push(RoutingEvent::InstructionCompleted {
            report: report.clone(),
            occurred_at: Timestamp::now(),
        });

        if let Some(callbacks) = self.callbacks.take() {
            callbacks.succeed(report);
        }
        Ok(())
    }

    /// Drain accumulated domain events.
    pub fn drain_events(&mut self) -> Vec<RoutingEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get pending events without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[RoutingEvent] {
        &self.events
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn ensure_not_terminal(&self) -> Result<(), RoutingError> {
        if self.is_terminal() {
            return Err(RoutingError::AlreadyTerminal {
                instruction_id: self.instruction.id().clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn outstanding_order(&self, order_id: &OrderId) -> Result<OutstandingOrder, RoutingError> {
        self.outstanding
            .get(order_id)
            .cloned()
            .ok_or_else(|| RoutingError::UnknownOrder {
                correlation: self.next_correlation_for_current(),
                order_id: order_id.clone(),
            })
    }

    fn validate_basket(&self, basket: &OrderBasket) -> Result<(), RoutingError> {
        let expected = self.next_correlation();
        if basket.is_empty() {
            return Err(self.violation("empty basket cannot start a wave".to_string()));
        }
        if basket.correlation() != &expected {
            return Err(self.violation(format!(
                "basket correlation {} does not match expected {expected}",
                basket.correlation()
            )));
        }

        let mut seen = BTreeSet::new();
        for order in basket {
            if order.correlation() != &expected {
                return Err(self.violation(format!(
                    "order {} carries foreign correlation {}",
                    order.id(),
                    order.correlation()
                )));
            }
            if !order.quantity().is_positive() {
                return Err(self.violation(format!(
                    "order {} has non-positive quantity {}",
                    order.id(),
                    order.quantity()
                )));
            }
            if !seen.insert(order.id().clone()) {
                return Err(self.violation(format!("order {} appears twice", order.id())));
            }
        }

        let total = basket.total_quantity();
        let remaining = self.remaining_quantity();
        if total > remaining {
            return Err(self.violation(format!(
                "basket quantity {total} exceeds remaining {remaining}"
            )));
        }
        Ok(())
    }

    fn settle_if_drained(&mut self) -> ApplyOutcome {
        if self.outstanding.is_empty() {
            self.settle_wave();
            ApplyOutcome::WaveSettled
        } else {
            ApplyOutcome::Pending
        }
    }

    fn settle_wave(&mut self) {
        let remaining = self.remaining_quantity();
        let failure = self
            .wave_failure
            .take()
            .unwrap_or(FailureReason::InsufficientFill { remaining });

        let correlation = self.next_correlation_for_current();
        self.status = ContextStatus::AwaitingRetry;
        self.events.push(RoutingEvent::WaveSettled {
            correlation,
            remaining,
            failure: failure.clone(),
            occurred_at: Timestamp::now(),
        });
        self.last_failure = Some(failure);
    }

    fn next_correlation_for_current(&self) -> CorrelationId {
        CorrelationId::new(
            self.instruction.id().clone(),
            self.wave.unwrap_or(WaveId::FIRST),
        )
    }

    fn violation(&self, message: String) -> RoutingError {
        RoutingError::InvariantViolation {
            instruction_id: self.instruction.id().clone(),
            message,
        }
    }
}
