//! Order Router Binary
//!
//! Paper-routes the instructions listed in the configuration against
//! simulated venues and logs each terminal outcome.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-router -- config/router.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ROUTER_CONFIG`: config path when no argument is given
//!   (default: `config/router.yaml`)
//! - `RUST_LOG`: overrides the configured log level

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use order_router::application::ports::NotificationSink;
use order_router::application::{NotificationDispatcher, RoutingEngine};
use order_router::config::{Config, DEFAULT_CONFIG_PATH, load_config};
use order_router::domain::routing::RoutingOutcome;
use order_router::infrastructure::{
    GreedySweepSolver, InMemoryMarketData, SimulatedVenue, TracingEventPublisher,
};
use order_router::observability::init_metrics;
use order_router::telemetry::init_tracing;

type PaperEngine =
    RoutingEngine<InMemoryMarketData, GreedySweepSolver, SimulatedVenue, TracingEventPublisher>;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ORDER_ROUTER_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(Some(&path)).with_context(|| format!("loading {path}"))?;
    init_tracing(&config.observability.logging).context("initializing tracing")?;

    if config.observability.metrics.enabled {
        let metrics = config.observability.metrics.to_metrics_config()?;
        init_metrics(&metrics).context("starting metrics exporter")?;
    }

    tracing::info!(
        config = %path,
        venues = config.simulation.venues.len(),
        instructions = config.simulation.instructions.len(),
        "Starting order router (paper mode)"
    );

    let engine = Arc::new(build_engine(&config));
    let shutdown = CancellationToken::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling in-flight instructions");
            ctrl_c.cancel();
        }
    });

    let mut tasks = JoinSet::new();
    for (index, entry) in config.simulation.instructions.iter().enumerate() {
        let instruction = entry
            .to_instruction()
            .with_context(|| format!("simulation.instructions[{index}]"))?;
        let engine = Arc::clone(&engine);
        let cancel = shutdown.child_token();
        tasks.spawn(async move { engine.route_with_cancellation(instruction, cancel).await });
    }

    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut errors = 0usize;

    while let Some(joined) = tasks.join_next().await {
        match joined.context("routing task panicked")? {
            Ok(RoutingOutcome::Completed(report)) => {
                completed += 1;
                tracing::info!(
                    instruction_id = %report.instruction_id,
                    executed = %report.executed_quantity,
                    waves = report.waves,
                    venues = report.fills.len(),
                    "Instruction completed"
                );
            }
            Ok(RoutingOutcome::Failed {
                instruction_id,
                reason,
            }) => {
                failed += 1;
                tracing::warn!(
                    instruction_id = %instruction_id,
                    reason = %reason,
                    "Instruction failed"
                );
            }
            Err(e) => {
                errors += 1;
                tracing::error!(error = %e, "Routing error");
            }
        }
    }

    tracing::info!(completed, failed, errors, "Paper routing finished");

    // Let late venue reports drain so they show up as unrecognized in the log.
    tokio::time::sleep(Duration::from_millis(config.simulation.latency_ms)).await;

    if errors > 0 {
        anyhow::bail!("{errors} instruction(s) ended with a routing error");
    }
    Ok(())
}

fn build_engine(config: &Config) -> PaperEngine {
    let dispatcher = Arc::new(NotificationDispatcher::new());
    let market_data = Arc::new(InMemoryMarketData::new());

    let sink: Arc<dyn NotificationSink> = dispatcher.clone();
    let venue = SimulatedVenue::new(sink)
        .with_latency(Duration::from_millis(config.simulation.latency_ms))
        .with_jitter(Duration::from_millis(config.simulation.jitter_ms))
        .with_market_data(Arc::clone(&market_data));

    for venue_config in &config.simulation.venues {
        let id = venue_config.venue_id();
        market_data.add_venue(id.clone());
        for quote in &venue_config.quotes {
            market_data.quote(id.clone(), quote.instrument(), quote.price(), quote.depth());
        }
        venue.set_behaviour(id.clone(), venue_config.behaviour.to_behaviour());
        venue.script(
            id,
            venue_config.script.iter().map(|b| b.to_behaviour()),
        );
    }

    RoutingEngine::new(
        market_data,
        Arc::new(GreedySweepSolver::new(config.solver.to_settings())),
        Arc::new(venue),
        Arc::new(TracingEventPublisher::new()),
        dispatcher,
        config.routing.retry.to_policy(),
        config.routing.to_engine_config(),
    )
}
