//! Prometheus metrics for the order router.
//!
//! # Example
//!
//! ```ignore
//! use order_router::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_wave("XNAS");
//! ```

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

use crate::domain::routing::RoutingError;

/// Counter for corrupted fill accounting.
pub const INVARIANT_VIOLATIONS: &str = "router_invariant_violations_total";

/// Counter for stale, duplicate or late reports and caller mistakes.
pub const ROUTING_REJECTIONS: &str = "router_routing_rejections_total";

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for route duration (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // Latency buckets from 1ms to 30s
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Instruction Metrics
// ============================================================================

/// Record a terminal instruction outcome.
///
/// # Arguments
///
/// * `outcome` - `"completed"` or a failure label such as `"no_liquidity"`
pub fn record_instruction_outcome(outcome: &str) {
    counter!(
        "router_instructions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the wall-clock time from `route` entry to terminal state.
pub fn record_route_duration(seconds: f64) {
    histogram!("router_route_duration_seconds").record(seconds);
}

// ============================================================================
// Wave Metrics
// ============================================================================

/// Record a dispatched wave.
///
/// # Arguments
///
/// * `instrument` - Instrument being routed
pub fn record_wave(instrument: &str) {
    counter!(
        "router_waves_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a child order handed to a venue.
pub fn record_child_order(venue: &str) {
    counter!(
        "router_child_orders_total",
        "venue" => venue.to_string()
    )
    .increment(1);
}

// ============================================================================
// Notification Metrics
// ============================================================================

/// Record a correlated venue notification.
///
/// # Arguments
///
/// * `kind` - `"executed"` or `"failed"`
pub fn record_notification(kind: &str) {
    counter!(
        "router_notifications_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a notification whose correlation matched no in-flight instruction.
pub fn record_unrecognized_notification() {
    counter!("router_unrecognized_notifications_total").increment(1);
}

/// Record a routing error under [`routing_error_metric`], labelled by kind.
pub fn record_routing_error(error: &RoutingError) {
    counter!(
        routing_error_metric(error),
        "kind" => error.label()
    )
    .increment(1);
}

/// Counter a routing error belongs to. Only invariant violations reach
/// [`INVARIANT_VIOLATIONS`].
#[must_use]
pub const fn routing_error_metric(error: &RoutingError) -> &'static str {
    if error.is_invariant_violation() {
        INVARIANT_VIOLATIONS
    } else {
        ROUTING_REJECTIONS
    }
}
