//! Observability configuration for logging and metrics.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::solver::default_true;
use crate::observability::MetricsConfig;

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Include span information.
    #[serde(default = "default_true")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            include_spans: true,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Start the exporter.
    #[serde(default)]
    pub enabled: bool,
    /// Listen address of the `/metrics` endpoint.
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
        }
    }
}

impl MetricsSettings {
    /// Build the exporter configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the address does not parse.
    pub fn to_metrics_config(&self) -> Result<MetricsConfig, ConfigError> {
        let addr: SocketAddr = self.listen_addr.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "observability.metrics.listen_addr '{}' is invalid: {e}",
                self.listen_addr
            ))
        })?;
        Ok(MetricsConfig::with_addr(addr))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}
