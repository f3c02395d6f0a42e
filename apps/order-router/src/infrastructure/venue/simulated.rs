//! Simulated venue for tests and paper routing.
//!
//! Accepts every basket synchronously and reports each child order later on
//! a spawned tokio task, the way a real venue gateway acknowledges first
//! and reports executions asynchronously. What gets reported is chosen per
//! venue: a one-shot script is consumed first, then the venue's standing
//! behaviour, then the global default.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rust_decimal::Decimal;

use crate::application::ports::{NotificationSink, VenueError, VenuePort};
use crate::domain::routing::{
    ExecutionNotification, Order, OrderBasket, VenueFailure, VenueNotification,
};
use crate::domain::shared::{Quantity, VenueId};
use crate::infrastructure::market_data::InMemoryMarketData;

/// How a simulated venue answers one child order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueBehaviour {
    /// Execute the full order quantity.
    FillAll,
    /// Execute exactly this quantity. Larger than the order over-reports.
    FillPartial(Quantity),
    /// Execute this share of the order, capped at the order quantity.
    /// A share that rounds to nothing fills the whole order.
    FillFraction(Decimal),
    /// Fail the order.
    Reject(VenueFailure),
    /// Never report.
    Silent,
}

impl VenueBehaviour {
    fn notification(&self, order: &Order) -> Option<VenueNotification> {
        match self {
            Self::FillAll => Some(VenueNotification::executed(order, order.quantity())),
            Self::FillPartial(quantity) => Some(VenueNotification::executed(order, *quantity)),
            Self::FillFraction(fraction) => {
                let share = Quantity::new((order.quantity().amount() * *fraction).round_dp(4))
                    .min(order.quantity());
                let executed = if share.is_positive() {
                    share
                } else {
                    order.quantity()
                };
                Some(VenueNotification::executed(order, executed))
            }
            Self::Reject(failure) => Some(VenueNotification::failed(order, failure.clone())),
            Self::Silent => None,
        }
    }
}

/// In-process [`VenuePort`] with scripted behaviour.
pub struct SimulatedVenue {
    sink: Arc<dyn NotificationSink>,
    default_behaviour: VenueBehaviour,
    behaviours: RwLock<HashMap<VenueId, VenueBehaviour>>,
    scripts: Mutex<HashMap<VenueId, VecDeque<VenueBehaviour>>>,
    dispatch_failures: Mutex<VecDeque<VenueError>>,
    dispatched: Mutex<Vec<OrderBasket>>,
    latency: Duration,
    jitter: Duration,
    market_data: Option<Arc<InMemoryMarketData>>,
}

impl SimulatedVenue {
    /// Create a venue that fills everything immediately.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            default_behaviour: VenueBehaviour::FillAll,
            behaviours: RwLock::new(HashMap::new()),
            scripts: Mutex::new(HashMap::new()),
            dispatch_failures: Mutex::new(VecDeque::new()),
            dispatched: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            market_data: None,
        }
    }

    /// Behaviour for venues without a standing or scripted behaviour.
    #[must_use]
    pub fn with_default_behaviour(mut self, behaviour: VenueBehaviour) -> Self {
        self.default_behaviour = behaviour;
        self
    }

    /// Delay before each notification is delivered.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Random extra delay, uniform in `[0, jitter]`, so reports arrive out of order.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Deplete displayed depth in `market_data` as fills are reported.
    #[must_use]
    pub fn with_market_data(mut self, market_data: Arc<InMemoryMarketData>) -> Self {
        self.market_data = Some(market_data);
        self
    }

    /// Set the standing behaviour of a venue.
    pub fn set_behaviour(&self, venue: impl Into<VenueId>, behaviour: VenueBehaviour) {
        self.behaviours.write().insert(venue.into(), behaviour);
    }

    /// Queue one-shot behaviours for a venue, consumed one per order.
    pub fn script(
        &self,
        venue: impl Into<VenueId>,
        behaviours: impl IntoIterator<Item = VenueBehaviour>,
    ) {
        self.scripts
            .lock()
            .entry(venue.into())
            .or_default()
            .extend(behaviours);
    }

    /// Make the next `dispatch` call fail with `error`. The basket is refused
    /// before any order is accepted.
    pub fn fail_next_dispatch(&self, error: VenueError) {
        self.dispatch_failures.lock().push_back(error);
    }

    /// Baskets accepted so far.
    #[must_use]
    pub fn dispatched(&self) -> Vec<OrderBasket> {
        self.dispatched.lock().clone()
    }

    /// Child orders accepted so far, in dispatch order.
    #[must_use]
    pub fn dispatched_orders(&self) -> Vec<Order> {
        self.dispatched
            .lock()
            .iter()
            .flat_map(|basket| basket.orders().to_vec())
            .collect()
    }

    /// Number of baskets accepted so far.
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().len()
    }

    fn behaviour_for(&self, venue: &VenueId) -> VenueBehaviour {
        if let Some(next) = self
            .scripts
            .lock()
            .get_mut(venue)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }
        self.behaviours
            .read()
            .get(venue)
            .cloned()
            .unwrap_or_else(|| self.default_behaviour.clone())
    }

    fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.latency;
        }
        let max = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max);
        self.latency + Duration::from_micros(extra)
    }

    fn deplete(&self, notification: &VenueNotification, order: &Order) {
        let Some(market_data) = &self.market_data else {
            return;
        };
        if let ExecutionNotification::Executed { quantity } = &notification.notification {
            market_data.consume(order.venue(), order.instrument(), *quantity);
        }
    }
}

impl fmt::Debug for SimulatedVenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedVenue")
            .field("default_behaviour", &self.default_behaviour)
            .field("latency", &self.latency)
            .field("jitter", &self.jitter)
            .field("dispatched", &self.dispatch_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VenuePort for SimulatedVenue {
    async fn dispatch(&self, basket: &OrderBasket) -> Result<(), VenueError> {
        if let Some(error) = self.dispatch_failures.lock().pop_front() {
            tracing::warn!(
                correlation = %basket.correlation(),
                error = %error,
                "simulated dispatch failure"
            );
            return Err(error);
        }

        self.dispatched.lock().push(basket.clone());

        for order in basket.iter() {
            let behaviour = self.behaviour_for(order.venue());
            tracing::debug!(
                order_id = %order.id(),
                venue = %order.venue(),
                quantity = %order.quantity(),
                behaviour = ?behaviour,
                "simulated venue accepted order"
            );

            let Some(notification) = behaviour.notification(order) else {
                continue;
            };
            self.deplete(&notification, order);

            let sink = Arc::clone(&self.sink);
            let delay = self.delay();
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                sink.notify(notification);
            });
        }

        Ok(())
    }
}
