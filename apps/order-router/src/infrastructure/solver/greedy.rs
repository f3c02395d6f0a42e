//! Greedy price-priority sweep.
//!
//! Walks venues from best to worst price and takes as much depth as each
//! one shows until the remaining quantity is covered or the venue budget
//! runs out. One child order per venue per wave.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::application::ports::SweepSolver;
use crate::domain::routing::{MarketSnapshot, OrderBasket, Side, SweepRequest};
use crate::domain::shared::{Quantity, Timestamp};

/// Tuning knobs for [`GreedySweepSolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreedySolverSettings {
    /// Snapshots older than this are ignored. `None` accepts any age.
    pub max_snapshot_age: Option<Duration>,
    /// Maximum number of venues per wave.
    pub max_venues: usize,
    /// Allocations smaller than this are not worth a child order.
    pub min_child_quantity: Quantity,
    /// Skip venues that failed an order in an earlier wave.
    pub exclude_failed_venues: bool,
}

impl Default for GreedySolverSettings {
    fn default() -> Self {
        Self {
            max_snapshot_age: Some(Duration::from_secs(5)),
            max_venues: 8,
            min_child_quantity: Quantity::from_i64(1),
            exclude_failed_venues: true,
        }
    }
}

/// Reference [`SweepSolver`] allocating by price priority.
#[derive(Debug, Clone, Default)]
pub struct GreedySweepSolver {
    settings: GreedySolverSettings,
}

impl GreedySweepSolver {
    /// Create a solver with the given settings.
    #[must_use]
    pub const fn new(settings: GreedySolverSettings) -> Self {
        Self { settings }
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &GreedySolverSettings {
        &self.settings
    }

    fn eligible<'a>(
        &self,
        request: &SweepRequest,
        snapshots: &'a [MarketSnapshot],
        now: Timestamp,
    ) -> Vec<&'a MarketSnapshot> {
        let instruction = &request.instruction;
        snapshots
            .iter()
            .filter(|s| &s.instrument == instruction.instrument())
            .filter(|s| s.has_liquidity())
            .filter(|s| {
                self.settings
                    .max_snapshot_age
                    .is_none_or(|age| !s.is_stale(age, now))
            })
            .filter(|s| instruction.accepts_price(s.best_price))
            .filter(|s| {
                !(self.settings.exclude_failed_venues && request.failed_venues.contains(&s.venue))
            })
            .collect()
    }
}

/// Best price first, then deeper book, then venue id for a stable order.
fn priority(side: Side, a: &MarketSnapshot, b: &MarketSnapshot) -> Ordering {
    let by_price = match side {
        Side::Buy => a.best_price.cmp(&b.best_price),
        Side::Sell => b.best_price.cmp(&a.best_price),
    };
    by_price
        .then_with(|| b.available_depth.cmp(&a.available_depth))
        .then_with(|| a.venue.cmp(&b.venue))
}

impl SweepSolver for GreedySweepSolver {
    fn solve(&self, request: &SweepRequest, snapshots: &[MarketSnapshot]) -> OrderBasket {
        let mut basket = OrderBasket::new(request.correlation.clone());
        if !request.remaining.is_positive() || self.settings.max_venues == 0 {
            return basket;
        }

        let side = request.instruction.side();
        let mut candidates = self.eligible(request, snapshots, Timestamp::now());
        candidates.sort_by(|a, b| priority(side, a, b));

        let mut remaining = request.remaining;
        let mut used = BTreeSet::new();

        for snapshot in candidates {
            if basket.len() >= self.settings.max_venues || !remaining.is_positive() {
                break;
            }
            if !used.insert(snapshot.venue.clone()) {
                continue;
            }

            let quantity = snapshot.available_depth.min(remaining);
            if quantity < self.settings.min_child_quantity {
                continue;
            }

            basket.push(request.child_order(snapshot.venue.clone(), quantity, None));
            remaining = remaining - quantity;
        }

        tracing::debug!(
            correlation = %request.correlation,
            remaining = %request.remaining,
            routed = %basket.total_quantity(),
            venues = basket.len(),
            "sweep solved"
        );

        basket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::InvestorInstruction;
    use crate::domain::shared::{CorrelationId, Instrument, Money, VenueId, WaveId};

    fn snapshot(venue: &str, cents: i64, depth: i64) -> MarketSnapshot {
        MarketSnapshot::new(
            VenueId::new(venue),
            Instrument::new("AAPL"),
            Money::from_cents(cents),
            Quantity::from_i64(depth),
        )
    }

    fn request(instruction: InvestorInstruction, remaining: i64) -> SweepRequest {
        SweepRequest {
            correlation: CorrelationId::new(instruction.id().clone(), WaveId::FIRST),
            instruction,
            remaining: Quantity::from_i64(remaining),
            failed_venues: BTreeSet::new(),
        }
    }

    fn allocations(basket: &OrderBasket) -> Vec<(String, Quantity)> {
        basket
            .iter()
            .map(|o| (o.venue().to_string(), o.quantity()))
            .collect()
    }

    #[test]
    fn buys_sweep_cheapest_venue_first() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let snapshots = vec![
            snapshot("V1", 10_010, 60),
            snapshot("V2", 10_000, 40),
            snapshot("V3", 10_020, 100),
        ];

        let basket = solver.solve(&request(instruction, 100), &snapshots);

        assert_eq!(
            allocations(&basket),
            vec![
                ("V2".to_string(), Quantity::from_i64(40)),
                ("V1".to_string(), Quantity::from_i64(60)),
            ]
        );
    }

    #[test]
    fn sells_sweep_richest_venue_first() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Sell, 50).unwrap();
        let snapshots = vec![snapshot("V1", 10_000, 100), snapshot("V2", 10_050, 30)];

        let basket = solver.solve(&request(instruction, 50), &snapshots);

        assert_eq!(
            allocations(&basket),
            vec![
                ("V2".to_string(), Quantity::from_i64(30)),
                ("V1".to_string(), Quantity::from_i64(20)),
            ]
        );
    }

    #[test]
    fn never_routes_more_than_remaining() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let snapshots = vec![snapshot("V1", 10_000, 500), snapshot("V2", 10_000, 500)];

        let basket = solver.solve(&request(instruction, 30), &snapshots);

        assert_eq!(basket.total_quantity(), Quantity::from_i64(30));
        assert_eq!(basket.len(), 1);
    }

    #[test]
    fn limit_price_filters_venues() {
        let solver = GreedySweepSolver::default();
        let instruction =
            InvestorInstruction::limit("AAPL", Side::Buy, 100, Money::from_cents(10_000)).unwrap();
        let snapshots = vec![snapshot("V1", 10_001, 100), snapshot("V2", 9_999, 10)];

        let basket = solver.solve(&request(instruction, 100), &snapshots);

        assert_eq!(
            allocations(&basket),
            vec![("V2".to_string(), Quantity::from_i64(10))]
        );
        assert_eq!(
            basket.orders()[0].limit_price(),
            Some(Money::from_cents(10_000))
        );
    }

    #[test]
    fn stale_and_foreign_snapshots_are_ignored() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let old = Timestamp::new(Timestamp::now().as_datetime() - chrono::Duration::seconds(60));
        let snapshots = vec![
            snapshot("V1", 10_000, 100).at(old),
            MarketSnapshot::new(
                VenueId::new("V2"),
                Instrument::new("MSFT"),
                Money::from_cents(10_000),
                Quantity::from_i64(100),
            ),
        ];

        let basket = solver.solve(&request(instruction, 100), &snapshots);

        assert!(basket.is_empty());
    }

    #[test]
    fn failed_venues_are_excluded() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let mut req = request(instruction, 100);
        req.failed_venues.insert(VenueId::new("V1"));
        let snapshots = vec![snapshot("V1", 9_000, 100), snapshot("V2", 10_000, 100)];

        let basket = solver.solve(&req, &snapshots);

        assert_eq!(
            allocations(&basket),
            vec![("V2".to_string(), Quantity::from_i64(100))]
        );
    }

    #[test]
    fn failed_venues_kept_when_exclusion_disabled() {
        let solver = GreedySweepSolver::new(GreedySolverSettings {
            exclude_failed_venues: false,
            ..GreedySolverSettings::default()
        });
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let mut req = request(instruction, 100);
        req.failed_venues.insert(VenueId::new("V1"));

        let basket = solver.solve(&req, &[snapshot("V1", 10_000, 100)]);

        assert_eq!(basket.len(), 1);
    }

    #[test]
    fn venue_budget_and_minimum_size() {
        let solver = GreedySweepSolver::new(GreedySolverSettings {
            max_venues: 2,
            min_child_quantity: Quantity::from_i64(10),
            ..GreedySolverSettings::default()
        });
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 100).unwrap();
        let snapshots = vec![
            snapshot("V1", 10_000, 5),
            snapshot("V2", 10_001, 20),
            snapshot("V3", 10_002, 20),
            snapshot("V4", 10_003, 20),
        ];

        let basket = solver.solve(&request(instruction, 100), &snapshots);

        assert_eq!(
            allocations(&basket),
            vec![
                ("V2".to_string(), Quantity::from_i64(20)),
                ("V3".to_string(), Quantity::from_i64(20)),
            ]
        );
    }

    #[test]
    fn orders_carry_request_correlation() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 10).unwrap();
        let req = request(instruction, 10);

        let basket = solver.solve(&req, &[snapshot("V1", 10_000, 10)]);

        assert_eq!(basket.correlation(), &req.correlation);
        assert!(basket.iter().all(|o| o.correlation() == &req.correlation));
    }

    #[test]
    fn no_liquidity_yields_empty_basket() {
        let solver = GreedySweepSolver::default();
        let instruction = InvestorInstruction::market("AAPL", Side::Buy, 10).unwrap();

        let basket = solver.solve(&request(instruction, 10), &[snapshot("V1", 10_000, 0)]);

        assert!(basket.is_empty());
    }
}
