//! Route Instruction Use Case
//!
//! Owns the solve / dispatch / reconcile / retry loop for one instruction:
//!
//! 1. Create an execution context and register it with the dispatcher.
//! 2. Solve a basket for the remaining quantity from fresh snapshots.
//! 3. Register the wave on the context, then dispatch it.
//! 4. Wait until the wave settles, completes, or the deadline or
//!    cancellation fires.
//! 5. On settlement ask the context whether to continue; back off and go
//!    to 2, or declare failure.
//!
//! The registration guard is dropped on every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::ports::{EventPublisherPort, MarketDataPort, SweepSolver, VenuePort};
use crate::application::services::{ContextHandle, NotificationDispatcher, WaveSignal};
use crate::domain::routing::{
    ContextStatus, ExecutionContext, ExecutionReport, FailureReason, InvestorInstruction,
    MarketSnapshot, RetryPolicy, RoutingError, RoutingOutcome, TerminalCallbacks,
};
use crate::domain::shared::Instrument;
use crate::observability;

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline for one instruction from `route` entry; `None` waits forever.
    pub instruction_timeout: Option<Duration>,
}

/// How a wave attempt ended before waiting for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaveStart {
    /// Orders are at the venues.
    Dispatched,
    /// The venue layer refused the whole basket; the wave settled immediately.
    Abandoned,
    /// The context reached a terminal state while solving.
    Terminal,
}

/// Why waiting was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    TimedOut,
}

/// The routing engine.
pub struct RoutingEngine<M, S, V, E>
where
    M: MarketDataPort,
    S: SweepSolver,
    V: VenuePort,
    E: EventPublisherPort,
{
    market_data: Arc<M>,
    solver: Arc<S>,
    venue: Arc<V>,
    event_publisher: Arc<E>,
    dispatcher: Arc<NotificationDispatcher>,
    retry_policy: Arc<dyn RetryPolicy>,
    config: EngineConfig,
}

impl<M, S, V, E> RoutingEngine<M, S, V, E>
where
    M: MarketDataPort,
    S: SweepSolver,
    V: VenuePort,
    E: EventPublisherPort,
{
    /// Create a new routing engine.
    ///
    /// `dispatcher` must be the same instance the venue layer notifies.
    pub fn new(
        market_data: Arc<M>,
        solver: Arc<S>,
        venue: Arc<V>,
        event_publisher: Arc<E>,
        dispatcher: Arc<NotificationDispatcher>,
        retry_policy: Arc<dyn RetryPolicy>,
        config: EngineConfig,
    ) -> Self {
        Self {
            market_data,
            solver,
            venue,
            event_publisher,
            dispatcher,
            retry_policy,
            config,
        }
    }

    /// The dispatcher this engine registers contexts with.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// Route an instruction and resolve once it is terminal.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError` for invariant violations, an invalid
    /// instruction or an instruction id already in flight. Business failures
    /// resolve as `Ok(RoutingOutcome::Failed { .. })`.
    pub async fn route(
        &self,
        instruction: InvestorInstruction,
    ) -> Result<RoutingOutcome, RoutingError> {
        self.route_with_cancellation(instruction, CancellationToken::new())
            .await
    }

    /// Route an instruction that fails with `FailureReason::Cancelled` once
    /// `cancel` fires. Child orders already at venues are not recalled.
    ///
    /// # Errors
    ///
    /// See [`Self::route`].
    pub async fn route_with_cancellation(
        &self,
        instruction: InvestorInstruction,
        cancel: CancellationToken,
    ) -> Result<RoutingOutcome, RoutingError> {
        let instruction_id = instruction.id().clone();
        let (tx, rx) = oneshot::channel();
        let success_tx = Arc::new(Mutex::new(Some(tx)));
        let failure_tx = Arc::clone(&success_tx);
        let failure_id = instruction_id.clone();

        let callbacks = TerminalCallbacks::new(
            move |report: ExecutionReport| {
                if let Some(tx) = success_tx.lock().take() {
                    let _ = tx.send(RoutingOutcome::Completed(report));
                }
            },
            move |reason: FailureReason| {
                if let Some(tx) = failure_tx.lock().take() {
                    let _ = tx.send(RoutingOutcome::Failed {
                        instruction_id: failure_id,
                        reason,
                    });
                }
            },
        );

        self.run(instruction, callbacks, cancel).await?;

        rx.await.map_err(|_| RoutingError::InvariantViolation {
            instruction_id,
            message: "context returned without a terminal callback".to_string(),
        })
    }

    /// Route an instruction, invoking exactly one of the callbacks exactly
    /// once before the returned future resolves.
    ///
    /// # Errors
    ///
    /// See [`Self::route`]. When an error is returned `on_failure` has already
    /// received `FailureReason::Internal`.
    pub async fn route_with_callbacks<FS, FF>(
        &self,
        instruction: InvestorInstruction,
        on_success: FS,
        on_failure: FF,
    ) -> Result<(), RoutingError>
    where
        FS: FnOnce(ExecutionReport) + Send + 'static,
        FF: FnOnce(FailureReason) + Send + 'static,
    {
        self.run(
            instruction,
            TerminalCallbacks::new(on_success, on_failure),
            CancellationToken::new(),
        )
        .await
    }

    #[tracing::instrument(
        name = "route",
        skip_all,
        fields(
            instruction_id = %instruction.id(),
            instrument = %instruction.instrument(),
            side = %instruction.side(),
            quantity = %instruction.quantity(),
        )
    )]
    async fn run(
        &self,
        instruction: InvestorInstruction,
        callbacks: TerminalCallbacks,
        cancel: CancellationToken,
    ) -> Result<(), RoutingError> {
        let started = Instant::now();
        let instruction_id = instruction.id().clone();
        let validation = validate(&instruction);

        let (tx, mut signals) = mpsc::unbounded_channel();
        let context = Arc::new(Mutex::new(ExecutionContext::new(
            instruction,
            Arc::clone(&self.retry_policy),
            callbacks,
        )));

        let result = match validation {
            Ok(()) => match self.dispatcher.register(
                instruction_id.clone(),
                ContextHandle::new(Arc::clone(&context), tx),
            ) {
                Ok(_registration) => {
                    info!("Routing instruction");
                    self.drive(&context, &mut signals, &cancel, started).await
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            error!(error = %err, "Routing aborted");
            observability::record_routing_error(err);
            let mut ctx = context.lock();
            if !ctx.is_terminal() {
                let reason = FailureReason::Internal {
                    message: err.to_string(),
                };
                if let Err(e) = ctx.declare_failure(reason) {
                    error!(error = %e, "Failed to terminate context");
                }
            }
        }

        self.publish_events(&context).await;
        record_outcome(&context, started);
        result
    }

    /// Drive waves until the context is terminal.
    async fn drive(
        &self,
        context: &Arc<Mutex<ExecutionContext>>,
        signals: &mut mpsc::UnboundedReceiver<WaveSignal>,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<(), RoutingError> {
        let deadline = self
            .config
            .instruction_timeout
            .map(|timeout| tokio::time::Instant::from_std(started) + timeout);

        loop {
            let start = self.route_wave(context).await?;
            self.publish_events(context).await;

            match start {
                WaveStart::Terminal => return Ok(()),
                WaveStart::Abandoned => {}
                WaveStart::Dispatched => {
                    let signal = tokio::select! {
                        signal = signals.recv() => signal,
                        () = cancel.cancelled() => {
                            return Self::interrupt(context, Interrupt::Cancelled);
                        }
                        () = sleep_until(deadline) => {
                            return Self::interrupt(context, Interrupt::TimedOut);
                        }
                    };

                    match signal {
                        Some(WaveSignal::Settled) => {}
                        Some(WaveSignal::Completed) => {
                            info!("Instruction fully executed");
                            return Ok(());
                        }
                        Some(WaveSignal::InvariantViolated(err)) => return Err(err),
                        None => {
                            return Err(RoutingError::InvariantViolation {
                                instruction_id: context.lock().instruction().id().clone(),
                                message: "wave signal channel closed".to_string(),
                            });
                        }
                    }
                }
            }

            let Some(delay) = Self::decide_retry(context)? else {
                return Ok(());
            };
            self.publish_events(context).await;

            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => {
                        return Self::interrupt(context, Interrupt::Cancelled);
                    }
                    () = sleep_until(deadline) => {
                        return Self::interrupt(context, Interrupt::TimedOut);
                    }
                }
            }
        }
    }

    /// One solve-and-dispatch step.
    async fn route_wave(
        &self,
        context: &Arc<Mutex<ExecutionContext>>,
    ) -> Result<WaveStart, RoutingError> {
        let request = context.lock().sweep_request();
        let instrument = request.instruction.instrument().clone();

        let snapshots = match self.load_snapshots(&instrument).await {
            Ok(snapshots) => snapshots,
            Err(message) => {
                warn!(error = %message, "Market data unavailable");
                fail_unless_terminal(context, FailureReason::MarketDataUnavailable { message })?;
                return Ok(WaveStart::Terminal);
            }
        };

        let basket = self.solver.solve(&request, &snapshots);
        if basket.is_empty() {
            info!(
                wave = %request.wave(),
                remaining = %request.remaining,
                "No liquidity for remaining quantity"
            );
            fail_unless_terminal(
                context,
                FailureReason::NoLiquidity {
                    remaining: request.remaining,
                },
            )?;
            return Ok(WaveStart::Terminal);
        }

        context.lock().begin_wave(&basket)?;

        observability::record_wave(instrument.as_str());
        for order in &basket {
            observability::record_child_order(order.venue().as_str());
            debug!(
                order_id = %order.id(),
                venue = %order.venue(),
                quantity = %order.quantity(),
                "Child order"
            );
        }
        info!(
            wave = %request.wave(),
            orders = basket.len(),
            quantity = %basket.total_quantity(),
            remaining = %request.remaining,
            "Dispatching wave"
        );

        if let Err(err) = self.venue.dispatch(&basket).await {
            let reason = FailureReason::DispatchFailed {
                message: err.to_string(),
            };
            let mut ctx = context.lock();
            if ctx.status() == ContextStatus::Active {
                if err.nothing_accepted() {
                    warn!(wave = %request.wave(), error = %err, "Basket refused, wave abandoned");
                    ctx.abandon_wave(reason)?;
                    return Ok(WaveStart::Abandoned);
                }
                // Some orders may be live; re-routing could over-execute.
                error!(
                    wave = %request.wave(),
                    error = %err,
                    "Basket dispatch outcome unknown, failing instruction"
                );
                ctx.declare_failure(reason)?;
                return Ok(WaveStart::Terminal);
            }
            warn!(
                wave = %request.wave(),
                error = %err,
                status = %ctx.status(),
                "Dispatch error after every order reported"
            );
        }

        Ok(WaveStart::Dispatched)
    }

    async fn load_snapshots(&self, instrument: &Instrument) -> Result<Vec<MarketSnapshot>, String> {
        let venues = self
            .market_data
            .available_venues()
            .await
            .map_err(|e| e.to_string())?;
        self.market_data
            .snapshots(instrument, &venues)
            .await
            .map_err(|e| e.to_string())
    }

    /// After a settled wave: `Some(backoff)` to retry, `None` once failed.
    fn decide_retry(
        context: &Arc<Mutex<ExecutionContext>>,
    ) -> Result<Option<Duration>, RoutingError> {
        let mut ctx = context.lock();
        if ctx.should_continue() {
            let delay = ctx.begin_retry()?;
            info!(
                retry = ctx.retries(),
                remaining = %ctx.remaining_quantity(),
                "Retrying remaining quantity"
            );
            return Ok(Some(delay));
        }

        let reason = final_failure(&ctx);
        info!(reason = %reason, "Retry denied, declaring failure");
        ctx.declare_failure(reason)?;
        Ok(None)
    }

    fn interrupt(
        context: &Arc<Mutex<ExecutionContext>>,
        interrupt: Interrupt,
    ) -> Result<(), RoutingError> {
        let remaining = context.lock().remaining_quantity();
        let reason = match interrupt {
            Interrupt::Cancelled => FailureReason::Cancelled { remaining },
            Interrupt::TimedOut => FailureReason::TimedOut { remaining },
        };
        warn!(reason = %reason, "Routing interrupted");
        fail_unless_terminal(context, reason)
    }

    async fn publish_events(&self, context: &Arc<Mutex<ExecutionContext>>) {
        let events = context.lock().drain_events();
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.event_publisher.publish_routing_events(events).await {
            warn!(error = %e, "Failed to publish routing events");
        }
    }

}

fn record_outcome(context: &Arc<Mutex<ExecutionContext>>, started: Instant) {
    let ctx = context.lock();
    let label = match ctx.status() {
        ContextStatus::Completed => "completed",
        ContextStatus::Failed => ctx.terminal_failure().map_or("failed", FailureReason::label),
        _ => "incomplete",
    };
    observability::record_instruction_outcome(label);
    observability::record_route_duration(started.elapsed().as_secs_f64());
}

fn validate(instruction: &InvestorInstruction) -> Result<(), RoutingError> {
    instruction.instrument().validate()?;
    instruction.quantity().validate_positive("quantity")?;
    if let Some(limit) = instruction.limit_price() {
        limit.validate_as_price()?;
    }
    Ok(())
}

/// Failure reported when the retry policy denies another wave.
///
/// The settling failure is reported as-is when no retry happened or it is
/// not retryable; otherwise the budget ran out.
fn final_failure(ctx: &ExecutionContext) -> FailureReason {
    let last = ctx
        .last_failure()
        .cloned()
        .unwrap_or(FailureReason::InsufficientFill {
            remaining: ctx.remaining_quantity(),
        });

    if ctx.retries() == 0 || !last.is_retryable() {
        last
    } else {
        FailureReason::RetriesExhausted {
            attempts: ctx.waves_dispatched(),
            last: Box::new(last),
        }
    }
}

fn fail_unless_terminal(
    context: &Arc<Mutex<ExecutionContext>>,
    reason: FailureReason,
) -> Result<(), RoutingError> {
    let mut ctx = context.lock();
    if ctx.is_terminal() {
        debug!(status = %ctx.status(), "Context already terminal");
        return Ok(());
    }
    ctx.declare_failure(reason)
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
