//! Observability module for metrics.
//!
//! Prometheus counters and histograms for the routing lifecycle. Logging is
//! initialised separately in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    INVARIANT_VIOLATIONS, MetricsConfig, MetricsError, ROUTING_REJECTIONS, init_metrics,
    record_child_order, record_instruction_outcome, record_notification, record_route_duration,
    record_routing_error, record_unrecognized_notification, record_wave, routing_error_metric,
};
