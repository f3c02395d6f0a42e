//! Notification Dispatcher
//!
//! Single process-wide receiver of venue notifications. Every in-flight
//! instruction registers its execution context under its instruction id;
//! notifications are routed by the correlation id they carry, so concurrent
//! instructions never see each other's fills.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::application::ports::NotificationSink;
use crate::domain::routing::{
    ApplyOutcome, ExecutionContext, FailureReason, RoutingError, VenueNotification,
};
use crate::domain::shared::{CorrelationId, InstructionId, OrderId};
use crate::observability;

/// Signal sent to the routing engine when a wave changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveSignal {
    /// Every order of the outstanding wave reported; quantity remains.
    Settled,
    /// The instruction is fully executed.
    Completed,
    /// A notification broke an invariant; the context has been failed.
    InvariantViolated(RoutingError),
}

/// Dispatcher-side handle to one in-flight execution context.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    context: Arc<Mutex<ExecutionContext>>,
    signals: mpsc::UnboundedSender<WaveSignal>,
}

impl ContextHandle {
    /// Create a handle.
    #[must_use]
    pub const fn new(
        context: Arc<Mutex<ExecutionContext>>,
        signals: mpsc::UnboundedSender<WaveSignal>,
    ) -> Self {
        Self { context, signals }
    }

    fn signal(&self, signal: WaveSignal) {
        if self.signals.send(signal).is_err() {
            debug!("Wave signal dropped, routing call already returned");
        }
    }
}

/// Notification delivery errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// No in-flight instruction owns the correlation.
    #[error("unrecognized notification for {correlation} (order {order_id})")]
    Unrecognized {
        /// Correlation carried by the notification.
        correlation: CorrelationId,
        /// Order identifier.
        order_id: OrderId,
    },

    /// The owning context refused the notification.
    #[error("notification for {correlation} rejected: {source}")]
    Rejected {
        /// Correlation carried by the notification.
        correlation: CorrelationId,
        /// Why the context refused it.
        #[source]
        source: RoutingError,
    },
}

/// Correlation registry shared by all routing calls.
#[derive(Debug, Default)]
pub struct NotificationDispatcher {
    registry: RwLock<HashMap<InstructionId, ContextHandle>>,
}

impl NotificationDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an execution context for the duration of a routing call.
    ///
    /// The returned guard removes the registration when dropped, on every
    /// exit path of the caller.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::DuplicateInstruction` if the id is already in flight.
    pub fn register(
        self: &Arc<Self>,
        instruction_id: InstructionId,
        handle: ContextHandle,
    ) -> Result<Registration, RoutingError> {
        let mut registry = self.registry.write();
        if registry.contains_key(&instruction_id) {
            return Err(RoutingError::DuplicateInstruction(instruction_id));
        }
        registry.insert(instruction_id.clone(), handle);
        debug!(instruction_id = %instruction_id, "Execution context registered");

        Ok(Registration {
            dispatcher: Arc::downgrade(self),
            instruction_id,
        })
    }

    /// Route a notification to its owning context.
    ///
    /// # Errors
    ///
    /// `Unrecognized` when no in-flight instruction matches the correlation.
    /// `Rejected` when the context refuses it (stale wave, unknown order,
    /// terminal context or invariant violation). Neither changes any
    /// executed quantity.
    pub fn deliver(
        &self,
        notification: &VenueNotification,
    ) -> Result<ApplyOutcome, NotificationError> {
        let correlation = &notification.correlation;
        let handle = self
            .registry
            .read()
            .get(&correlation.instruction_id)
            .cloned();

        let Some(handle) = handle else {
            warn!(
                correlation = %correlation,
                order_id = %notification.order_id,
                venue = %notification.venue,
                "Unrecognized venue notification"
            );
            observability::record_unrecognized_notification();
            return Err(NotificationError::Unrecognized {
                correlation: correlation.clone(),
                order_id: notification.order_id.clone(),
            });
        };

        observability::record_notification(notification.notification.kind());

        let result = {
            let mut context = handle.context.lock();
            let result = context.apply(notification);
            if let Err(err) = &result {
                if err.is_invariant_violation() {
                    let reason = FailureReason::Internal {
                        message: err.to_string(),
                    };
                    if let Err(e) = context.declare_failure(reason) {
                        debug!(error = %e, "Context already terminal");
                    }
                }
            }
            result
        };

        match result {
            Ok(outcome) => {
                match outcome {
                    ApplyOutcome::Pending => {}
                    ApplyOutcome::WaveSettled => handle.signal(WaveSignal::Settled),
                    ApplyOutcome::Completed => handle.signal(WaveSignal::Completed),
                }
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    correlation = %correlation,
                    order_id = %notification.order_id,
                    venue = %notification.venue,
                    error = %err,
                    "Venue notification rejected"
                );
                observability::record_routing_error(&err);
                if err.is_invariant_violation() {
                    handle.signal(WaveSignal::InvariantViolated(err.clone()));
                }
                Err(NotificationError::Rejected {
                    correlation: correlation.clone(),
                    source: err,
                })
            }
        }
    }

    /// Number of instructions currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns true if `instruction_id` is in flight.
    #[must_use]
    pub fn is_registered(&self, instruction_id: &InstructionId) -> bool {
        self.registry.read().contains_key(instruction_id)
    }

    fn unregister(&self, instruction_id: &InstructionId) {
        if self.registry.write().remove(instruction_id).is_some() {
            debug!(instruction_id = %instruction_id, "Execution context unregistered");
        }
    }
}

impl NotificationSink for NotificationDispatcher {
    fn notify(&self, notification: VenueNotification) {
        // Failures are logged and counted inside `deliver`.
        let _ = self.deliver(&notification);
    }
}

/// Scoped registration; unregisters on drop.
#[derive(Debug)]
pub struct Registration {
    dispatcher: Weak<NotificationDispatcher>,
    instruction_id: InstructionId,
}

impl Registration {
    /// The registered instruction.
    #[must_use]
    pub const fn instruction_id(&self) -> &InstructionId {
        &self.instruction_id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unregister(&self.instruction_id);
        }
    }
}
