//! Routing Scenario Integration Tests
//!
//! Drives the routing engine end to end through the notification dispatcher,
//! the simulated venue and in-memory market data.

// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;
use test_case::test_case;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use order_router::application::ports::{
    MarketDataError, MarketDataPort, NotificationSink, SweepSolver, VenueError, VenuePort,
};
use order_router::application::{
    EngineConfig, NotificationDispatcher, NotificationError, RoutingEngine,
};
use order_router::domain::routing::{
    ApplyOutcome, BackoffRetryPolicy, ExecutionReport, FailureReason, InvestorInstruction,
    MarketSnapshot, NoRetryPolicy, Order, OrderBasket, RetryPolicy, RoutingError, RoutingOutcome,
    Side, SweepRequest, VenueFailure, VenueNotification,
};
use order_router::domain::shared::{Instrument, InstructionId, Money, Quantity, VenueId};
use order_router::infrastructure::{
    GreedySweepSolver, InMemoryMarketData, RecordingEventPublisher, SimulatedVenue,
    VenueBehaviour,
};

// =============================================================================
// Fixtures
// =============================================================================

/// Solver returning a fixed allocation per wave; later waves repeat the last one.
#[derive(Debug, Default)]
struct ScriptedSolver {
    waves: Vec<Vec<(&'static str, i64)>>,
}

impl ScriptedSolver {
    fn new(waves: Vec<Vec<(&'static str, i64)>>) -> Self {
        Self { waves }
    }
}

impl SweepSolver for ScriptedSolver {
    fn solve(&self, request: &SweepRequest, _snapshots: &[MarketSnapshot]) -> OrderBasket {
        let index = (request.wave().sequence() as usize - 1).min(self.waves.len().saturating_sub(1));
        let orders = self
            .waves
            .get(index)
            .map(|legs| {
                legs.iter()
                    .map(|(venue, qty)| {
                        request.child_order(VenueId::new(*venue), Quantity::from_i64(*qty), None)
                    })
                    .collect()
            })
            .unwrap_or_default();
        OrderBasket::with_orders(request.correlation.clone(), orders)
    }
}

type Engine<M, S> = RoutingEngine<M, S, SimulatedVenue, RecordingEventPublisher>;

struct Harness<M: MarketDataPort, S: SweepSolver> {
    engine: Engine<M, S>,
    venue: Arc<SimulatedVenue>,
    events: Arc<RecordingEventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
}

fn harness_with<M, S>(
    market_data: Arc<M>,
    solver: S,
    retry_policy: Arc<dyn RetryPolicy>,
    config: EngineConfig,
    configure: impl FnOnce(SimulatedVenue) -> SimulatedVenue,
) -> Harness<M, S>
where
    M: MarketDataPort,
    S: SweepSolver,
{
    let dispatcher = Arc::new(NotificationDispatcher::new());
    let sink: Arc<dyn NotificationSink> = dispatcher.clone();
    let venue = Arc::new(configure(SimulatedVenue::new(sink)));
    let events = Arc::new(RecordingEventPublisher::new());

    let engine = RoutingEngine::new(
        market_data,
        Arc::new(solver),
        Arc::clone(&venue),
        Arc::clone(&events),
        Arc::clone(&dispatcher),
        retry_policy,
        config,
    );

    Harness {
        engine,
        venue,
        events,
        dispatcher,
    }
}

fn harness<S: SweepSolver>(
    solver: S,
    retry_policy: Arc<dyn RetryPolicy>,
) -> Harness<InMemoryMarketData, S> {
    harness_with(
        Arc::new(InMemoryMarketData::new()),
        solver,
        retry_policy,
        EngineConfig::default(),
        |venue| venue,
    )
}

fn qty(n: i64) -> Quantity {
    Quantity::from_i64(n)
}

fn buy(quantity: i64) -> InvestorInstruction {
    InvestorInstruction::market("AAPL", Side::Buy, quantity).unwrap()
}

fn retryable() -> VenueFailure {
    VenueFailure::retryable("THROTTLED", "order rate exceeded")
}

fn failure_of(outcome: &RoutingOutcome) -> &FailureReason {
    outcome
        .failure()
        .unwrap_or_else(|| panic!("expected failure, got {outcome:?}"))
}

fn report_of(outcome: &RoutingOutcome) -> &ExecutionReport {
    outcome
        .report()
        .unwrap_or_else(|| panic!("expected completion, got {outcome:?}"))
}

async fn wait_for_dispatches(venue: &SimulatedVenue, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while venue.dispatch_count() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("wave was not dispatched in time");
}

fn order_at(venue: &SimulatedVenue, venue_id: &str) -> Order {
    venue
        .dispatched_orders()
        .into_iter()
        .rev()
        .find(|o| o.venue().as_str() == venue_id)
        .unwrap_or_else(|| panic!("no order dispatched to {venue_id}"))
}

/// Counts terminal callback invocations.
#[derive(Debug, Default, Clone)]
struct Callbacks {
    successes: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
    report: Arc<Mutex<Option<ExecutionReport>>>,
    reason: Arc<Mutex<Option<FailureReason>>>,
}

impl Callbacks {
    fn on_success(&self) -> impl FnOnce(ExecutionReport) + Send + 'static {
        let successes = Arc::clone(&self.successes);
        let slot = Arc::clone(&self.report);
        move |report| {
            successes.fetch_add(1, Ordering::SeqCst);
            *slot.lock() = Some(report);
        }
    }

    fn on_failure(&self) -> impl FnOnce(FailureReason) + Send + 'static {
        let failures = Arc::clone(&self.failures);
        let slot = Arc::clone(&self.reason);
        move |reason| {
            failures.fetch_add(1, Ordering::SeqCst);
            *slot.lock() = Some(reason);
        }
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.successes.load(Ordering::SeqCst),
            self.failures.load(Ordering::SeqCst),
        )
    }
}

// =============================================================================
// Scenarios A-D
// =============================================================================

#[tokio::test]
async fn scenario_a_single_venue_full_fill() {
    let h = harness(ScriptedSolver::new(vec![vec![("V1", 100)]]), Arc::new(NoRetryPolicy));
    let callbacks = Callbacks::default();

    h.engine
        .route_with_callbacks(buy(100), callbacks.on_success(), callbacks.on_failure())
        .await
        .unwrap();

    assert_eq!(callbacks.counts(), (1, 0));
    let report = callbacks.report.lock().clone().unwrap();
    assert_eq!(report.executed_quantity, qty(100));
    assert_eq!(report.waves, 1);
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].venue, VenueId::new("V1"));
    assert_eq!(h.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn scenario_a_publishes_lifecycle_events() {
    let h = harness(ScriptedSolver::new(vec![vec![("V1", 100)]]), Arc::new(NoRetryPolicy));
    let instruction = buy(100);
    let id = instruction.id().clone();

    let outcome = h.engine.route(instruction).await.unwrap();

    assert!(outcome.is_completed());
    let types: Vec<_> = h
        .events
        .events_for(&id)
        .iter()
        .map(|e| e.event_type())
        .collect();
    assert_eq!(types.first(), Some(&"INSTRUCTION_ACCEPTED"));
    assert_eq!(types.last(), Some(&"INSTRUCTION_COMPLETED"));
    assert!(types.contains(&"WAVE_DISPATCHED"));
    assert!(types.contains(&"ORDER_EXECUTED"));
}

#[tokio::test]
async fn scenario_b_failed_wave_is_rerouted() {
    let h = harness(
        ScriptedSolver::new(vec![vec![("V1", 60)], vec![("V2", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(3)),
    );
    h.venue.script("V1", [VenueBehaviour::Reject(retryable())]);

    let outcome = h.engine.route(buy(100)).await.unwrap();

    let report = report_of(&outcome);
    assert_eq!(report.executed_quantity, qty(100));
    assert_eq!(report.waves, 2);
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].venue, VenueId::new("V2"));
    assert_eq!(h.venue.dispatch_count(), 2);
    assert_eq!(h.venue.dispatched()[1].total_quantity(), qty(100));
}

#[tokio::test]
async fn scenario_c_retry_denied_fails_once_without_redispatch() {
    let h = harness(ScriptedSolver::new(vec![vec![("V1", 50)]]), Arc::new(NoRetryPolicy));
    h.venue.set_behaviour("V1", VenueBehaviour::Reject(retryable()));
    let callbacks = Callbacks::default();

    h.engine
        .route_with_callbacks(buy(50), callbacks.on_success(), callbacks.on_failure())
        .await
        .unwrap();

    assert_eq!(callbacks.counts(), (0, 1));
    let reason = callbacks.reason.lock().clone().unwrap();
    assert!(matches!(reason, FailureReason::VenueRejected { .. }));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.venue.dispatch_count(), 1);
    assert_eq!(callbacks.counts(), (0, 1));
}

#[test_case(["V1", "V2"] ; "v1 reports first")]
#[test_case(["V2", "V1"] ; "v2 reports first")]
#[tokio::test]
async fn scenario_d_split_wave_completes_after_both_legs(arrival: [&'static str; 2]) {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 60), ("V2", 40)]]),
        Arc::new(NoRetryPolicy),
        EngineConfig::default(),
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );
    let callbacks = Callbacks::default();

    let route = h
        .engine
        .route_with_callbacks(buy(100), callbacks.on_success(), callbacks.on_failure());
    let drive = async {
        wait_for_dispatches(&h.venue, 1).await;

        let first = order_at(&h.venue, arrival[0]);
        let outcome = h
            .dispatcher
            .deliver(&VenueNotification::executed(&first, first.quantity()))
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Pending);
        assert_eq!(callbacks.counts(), (0, 0));

        let second = order_at(&h.venue, arrival[1]);
        let outcome = h
            .dispatcher
            .deliver(&VenueNotification::executed(&second, second.quantity()))
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Completed);
    };

    let (result, ()) = tokio::join!(route, drive);

    result.unwrap();
    assert_eq!(callbacks.counts(), (1, 0));
    let report = callbacks.report.lock().clone().unwrap();
    assert_eq!(report.executed_quantity, qty(100));
    assert_eq!(report.fills.len(), 2);
}

// =============================================================================
// Retry behaviour
// =============================================================================

#[tokio::test]
async fn retries_exhausted_reports_attempts() {
    let h = harness(
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(2)),
    );
    h.venue.set_behaviour("V1", VenueBehaviour::Reject(retryable()));

    let outcome = h.engine.route(buy(100)).await.unwrap();

    match failure_of(&outcome) {
        FailureReason::RetriesExhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(**last, FailureReason::VenueRejected { .. }));
        }
        other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(h.venue.dispatch_count(), 3);
}

#[tokio::test]
async fn permanent_rejection_is_not_retried() {
    let h = harness(
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(5)),
    );
    h.venue.set_behaviour(
        "V1",
        VenueBehaviour::Reject(VenueFailure::permanent("HALTED", "instrument halted")),
    );

    let outcome = h.engine.route(buy(100)).await.unwrap();

    match failure_of(&outcome) {
        FailureReason::VenueRejected { venue, failure } => {
            assert_eq!(venue, &VenueId::new("V1"));
            assert!(!failure.retryable);
        }
        other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(h.venue.dispatch_count(), 1);
}

#[tokio::test]
async fn partial_fill_residual_is_rerouted() {
    let market_data = Arc::new(InMemoryMarketData::new());
    market_data.quote("V1", "AAPL", Money::from_cents(10_000), 100);
    let h = harness_with(
        market_data,
        GreedySweepSolver::default(),
        Arc::new(BackoffRetryPolicy::immediate(3)),
        EngineConfig::default(),
        |venue| venue,
    );
    h.venue.script("V1", [VenueBehaviour::FillPartial(qty(40))]);

    let outcome = h.engine.route(buy(100)).await.unwrap();

    let report = report_of(&outcome);
    assert_eq!(report.executed_quantity, qty(100));
    assert_eq!(report.waves, 2);
    assert_eq!(h.venue.dispatched()[1].total_quantity(), qty(60));
}

#[tokio::test]
async fn refused_basket_is_retried() {
    let h = harness(
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(3)),
    );
    h.venue.fail_next_dispatch(VenueError::Rejected {
        message: "gateway busy".to_string(),
    });

    let outcome = h.engine.route(buy(100)).await.unwrap();

    let report = report_of(&outcome);
    assert_eq!(report.waves, 2);
    assert_eq!(h.venue.dispatch_count(), 1);
}

#[tokio::test]
async fn connection_error_fails_without_rerouting() {
    let h = harness(
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(3)),
    );
    h.venue.fail_next_dispatch(VenueError::ConnectionError {
        message: "connection reset".to_string(),
    });

    let outcome = h.engine.route(buy(100)).await.unwrap();

    assert!(matches!(
        failure_of(&outcome),
        FailureReason::DispatchFailed { .. }
    ));
    assert_eq!(h.venue.dispatch_count(), 0);
    assert_eq!(h.dispatcher.in_flight(), 0);
}

/// Accepts the first order of every basket, then loses the connection.
#[derive(Debug, Default)]
struct DropsAfterFirstOrder {
    accepted: Mutex<Vec<Order>>,
    calls: AtomicUsize,
}

#[async_trait]
impl VenuePort for DropsAfterFirstOrder {
    async fn dispatch(&self, basket: &OrderBasket) -> Result<(), VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(first) = basket.orders().first() {
            self.accepted.lock().push(first.clone());
        }
        Err(VenueError::ConnectionError {
            message: "connection reset mid-basket".to_string(),
        })
    }
}

#[tokio::test]
async fn partially_sent_basket_is_never_rerouted() {
    let dispatcher = Arc::new(NotificationDispatcher::new());
    let venue = Arc::new(DropsAfterFirstOrder::default());
    let engine = RoutingEngine::new(
        Arc::new(InMemoryMarketData::new()),
        Arc::new(ScriptedSolver::new(vec![
            vec![("V1", 60), ("V2", 40)],
            vec![("V3", 100)],
        ])),
        Arc::clone(&venue),
        Arc::new(RecordingEventPublisher::new()),
        Arc::clone(&dispatcher),
        Arc::new(BackoffRetryPolicy::immediate(3)),
        EngineConfig::default(),
    );

    let outcome = engine.route(buy(100)).await.unwrap();

    assert!(matches!(
        failure_of(&outcome),
        FailureReason::DispatchFailed { .. }
    ));
    assert_eq!(venue.calls.load(Ordering::SeqCst), 1);

    // The order that did reach V1 reports after the instruction ended.
    let live = venue.accepted.lock()[0].clone();
    let err = dispatcher
        .deliver(&VenueNotification::executed(&live, live.quantity()))
        .unwrap_err();
    assert!(matches!(err, NotificationError::Unrecognized { .. }));
}

// =============================================================================
// Termination
// =============================================================================

#[tokio::test]
async fn no_liquidity_fails_without_dispatch() {
    let h = harness(GreedySweepSolver::default(), Arc::new(BackoffRetryPolicy::immediate(10)));

    let outcome = tokio::time::timeout(Duration::from_secs(2), h.engine.route(buy(100)))
        .await
        .expect("route must terminate")
        .unwrap();

    assert_eq!(
        failure_of(&outcome),
        &FailureReason::NoLiquidity { remaining: qty(100) }
    );
    assert_eq!(h.venue.dispatch_count(), 0);
}

#[tokio::test]
async fn liquidity_exhausted_after_failed_venue_terminates() {
    let market_data = Arc::new(InMemoryMarketData::new());
    market_data.quote("V1", "AAPL", Money::from_cents(10_000), 500);
    let h = harness_with(
        market_data,
        GreedySweepSolver::default(),
        Arc::new(BackoffRetryPolicy::immediate(10)),
        EngineConfig::default(),
        |venue| venue,
    );
    h.venue.set_behaviour("V1", VenueBehaviour::Reject(retryable()));

    let outcome = tokio::time::timeout(Duration::from_secs(2), h.engine.route(buy(100)))
        .await
        .expect("route must terminate")
        .unwrap();

    assert!(matches!(
        failure_of(&outcome),
        FailureReason::NoLiquidity { .. }
    ));
    assert_eq!(h.venue.dispatch_count(), 1);
}

#[tokio::test]
async fn silent_venue_times_out() {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(NoRetryPolicy),
        EngineConfig {
            instruction_timeout: Some(Duration::from_millis(100)),
        },
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );

    let outcome = h.engine.route(buy(100)).await.unwrap();

    assert_eq!(
        failure_of(&outcome),
        &FailureReason::TimedOut { remaining: qty(100) }
    );
    assert_eq!(h.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn cancellation_fails_in_flight_instruction() {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(NoRetryPolicy),
        EngineConfig::default(),
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );
    let token = CancellationToken::new();

    let cancel = async {
        wait_for_dispatches(&h.venue, 1).await;
        token.cancel();
    };
    let (outcome, ()) = tokio::join!(
        h.engine.route_with_cancellation(buy(100), token.clone()),
        cancel
    );

    assert_eq!(
        failure_of(&outcome.unwrap()),
        &FailureReason::Cancelled { remaining: qty(100) }
    );
}

// =============================================================================
// Correlation, idempotence and concurrency
// =============================================================================

#[tokio::test]
async fn late_notification_is_unrecognized() {
    let h = harness(ScriptedSolver::new(vec![vec![("V1", 100)]]), Arc::new(NoRetryPolicy));

    let outcome = h.engine.route(buy(100)).await.unwrap();
    assert!(outcome.is_completed());

    let order = order_at(&h.venue, "V1");
    let err = h
        .dispatcher
        .deliver(&VenueNotification::executed(&order, order.quantity()))
        .unwrap_err();

    assert!(matches!(err, NotificationError::Unrecognized { .. }));
}

#[tokio::test]
async fn duplicate_notification_does_not_change_quantity() {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 60), ("V2", 40)]]),
        Arc::new(NoRetryPolicy),
        EngineConfig::default(),
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );

    let drive = async {
        wait_for_dispatches(&h.venue, 1).await;
        let v1 = order_at(&h.venue, "V1");
        let executed = VenueNotification::executed(&v1, v1.quantity());
        h.dispatcher.deliver(&executed).unwrap();

        let err = h.dispatcher.deliver(&executed).unwrap_err();
        assert!(matches!(
            err,
            NotificationError::Rejected {
                source: RoutingError::UnknownOrder { .. },
                ..
            }
        ));

        let v2 = order_at(&h.venue, "V2");
        h.dispatcher
            .deliver(&VenueNotification::executed(&v2, v2.quantity()))
            .unwrap();
    };
    let (outcome, ()) = tokio::join!(h.engine.route(buy(100)), drive);

    assert_eq!(report_of(&outcome.unwrap()).executed_quantity, qty(100));
}

#[tokio::test]
async fn stale_wave_notification_is_rejected() {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 100)], vec![("V2", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(3)),
        EngineConfig::default(),
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );
    h.venue.script("V1", [VenueBehaviour::Reject(retryable())]);

    let drive = async {
        wait_for_dispatches(&h.venue, 2).await;

        let stale = order_at(&h.venue, "V1");
        let err = h
            .dispatcher
            .deliver(&VenueNotification::executed(&stale, stale.quantity()))
            .unwrap_err();
        assert!(matches!(
            err,
            NotificationError::Rejected {
                source: RoutingError::StaleWave { .. },
                ..
            }
        ));

        let current = order_at(&h.venue, "V2");
        h.dispatcher
            .deliver(&VenueNotification::executed(&current, current.quantity()))
            .unwrap();
    };
    let (outcome, ()) = tokio::join!(h.engine.route(buy(100)), drive);

    let outcome = outcome.unwrap();
    let report = report_of(&outcome);
    assert_eq!(report.executed_quantity, qty(100));
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].venue, VenueId::new("V2"));
}

#[tokio::test]
async fn over_execution_is_an_invariant_violation() {
    let h = harness(ScriptedSolver::new(vec![vec![("V1", 100)]]), Arc::new(NoRetryPolicy));
    h.venue.set_behaviour("V1", VenueBehaviour::FillPartial(qty(150)));
    let callbacks = Callbacks::default();

    let err = h
        .engine
        .route_with_callbacks(buy(100), callbacks.on_success(), callbacks.on_failure())
        .await
        .unwrap_err();

    assert!(err.is_invariant_violation());
    assert_eq!(callbacks.counts(), (0, 1));
    let reason = callbacks.reason.lock().clone().unwrap();
    assert!(matches!(reason, FailureReason::Internal { .. }));
    assert_eq!(h.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn duplicate_in_flight_instruction_is_rejected() {
    let h = harness_with(
        Arc::new(InMemoryMarketData::new()),
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(NoRetryPolicy),
        EngineConfig {
            instruction_timeout: Some(Duration::from_millis(200)),
        },
        |venue| venue.with_default_behaviour(VenueBehaviour::Silent),
    );
    let instruction = buy(100).with_id(InstructionId::new("dup-1"));
    let duplicate = instruction.clone();
    let callbacks = Callbacks::default();

    let second = async {
        wait_for_dispatches(&h.venue, 1).await;
        h.engine
            .route_with_callbacks(duplicate, callbacks.on_success(), callbacks.on_failure())
            .await
    };
    let (first, second) = tokio::join!(h.engine.route(instruction), second);

    assert_eq!(
        second.unwrap_err(),
        RoutingError::DuplicateInstruction(InstructionId::new("dup-1"))
    );
    assert_eq!(callbacks.counts(), (0, 1));
    assert!(matches!(
        failure_of(&first.unwrap()),
        FailureReason::TimedOut { .. }
    ));
    assert_eq!(h.venue.dispatch_count(), 1);
}

#[tokio::test]
async fn concurrent_instructions_do_not_share_fills() {
    let market_data = Arc::new(InMemoryMarketData::new());
    for (venue, cents) in [("V1", 10_000), ("V2", 10_001), ("V3", 10_002)] {
        market_data.quote(venue, "AAPL", Money::from_cents(cents), 10_000);
        market_data.quote(venue, "MSFT", Money::from_cents(cents * 4), 10_000);
    }
    let h = Arc::new(harness_with(
        market_data,
        GreedySweepSolver::default(),
        Arc::new(BackoffRetryPolicy::immediate(3)),
        EngineConfig {
            instruction_timeout: Some(Duration::from_secs(5)),
        },
        |venue| venue.with_jitter(Duration::from_millis(10)),
    ));

    let mut tasks = JoinSet::new();
    for i in 1..=8_i64 {
        let h = Arc::clone(&h);
        let symbol = if i % 2 == 0 { "AAPL" } else { "MSFT" };
        let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
        let instruction = InvestorInstruction::new(
            InstructionId::new(format!("ins-{i}")),
            Instrument::new(symbol),
            side,
            qty(i * 25),
            None,
        )
        .unwrap();
        tasks.spawn(async move { (i, h.engine.route(instruction).await) });
    }

    let mut seen = BTreeSet::new();
    while let Some(joined) = tasks.join_next().await {
        let (i, result) = joined.unwrap();
        let outcome = result.unwrap();
        let report = report_of(&outcome);
        assert_eq!(report.instruction_id, InstructionId::new(format!("ins-{i}")));
        assert_eq!(report.executed_quantity, qty(i * 25));
        let per_venue: Quantity = report.fills.iter().map(|f| f.quantity).sum();
        assert_eq!(per_venue, qty(i * 25));
        seen.insert(i);
    }

    assert_eq!(seen.len(), 8);
    assert_eq!(h.dispatcher.in_flight(), 0);
    for i in 1..=8_i64 {
        let events = h.events.events_for(&InstructionId::new(format!("ins-{i}")));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }
}

// =============================================================================
// Market data port failures
// =============================================================================

mock! {
    MarketData {}

    #[async_trait]
    impl MarketDataPort for MarketData {
        async fn available_venues(&self) -> Result<BTreeSet<VenueId>, MarketDataError>;

        async fn snapshots(
            &self,
            instrument: &Instrument,
            venues: &BTreeSet<VenueId>,
        ) -> Result<Vec<MarketSnapshot>, MarketDataError>;
    }
}

#[tokio::test]
async fn market_data_outage_fails_instruction() {
    let mut market_data = MockMarketData::new();
    market_data.expect_available_venues().times(1).returning(|| {
        Err(MarketDataError::Unavailable {
            message: "feed disconnected".to_string(),
        })
    });
    market_data.expect_snapshots().never();

    let h = harness_with(
        Arc::new(market_data),
        ScriptedSolver::new(vec![vec![("V1", 100)]]),
        Arc::new(BackoffRetryPolicy::immediate(3)),
        EngineConfig::default(),
        |venue| venue,
    );

    let outcome = h.engine.route(buy(100)).await.unwrap();

    assert!(matches!(
        failure_of(&outcome),
        FailureReason::MarketDataUnavailable { .. }
    ));
    assert_eq!(h.venue.dispatch_count(), 0);
}

#[tokio::test]
async fn snapshots_are_requested_for_available_venues() {
    let venues: BTreeSet<VenueId> = [VenueId::new("V1")].into_iter().collect();
    let expected = venues.clone();

    let mut market_data = MockMarketData::new();
    market_data
        .expect_available_venues()
        .returning(move || Ok(venues.clone()));
    market_data
        .expect_snapshots()
        .withf(move |instrument, requested| {
            instrument == &Instrument::new("AAPL") && requested == &expected
        })
        .returning(|instrument, _| {
            Ok(vec![MarketSnapshot::new(
                VenueId::new("V1"),
                instrument.clone(),
                Money::from_cents(10_000),
                Quantity::from_i64(100),
            )])
        });

    let h = harness_with(
        Arc::new(market_data),
        GreedySweepSolver::default(),
        Arc::new(NoRetryPolicy),
        EngineConfig::default(),
        |venue| venue,
    );

    let outcome = h.engine.route(buy(100)).await.unwrap();

    assert_eq!(report_of(&outcome).executed_quantity, qty(100));
}
