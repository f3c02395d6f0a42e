//! Tracing Setup
//!
//! Installs the global `tracing` subscriber from [`LoggingConfig`].
//!
//! # Configuration
//!
//! - `RUST_LOG`: overrides the configured level (standard `EnvFilter` syntax)
//! - `logging.format`: `json` for machine-readable lines, `pretty` for humans
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_router::telemetry::init_tracing;
//!
//! init_tracing(&config.observability.logging)?;
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LoggingConfig;

/// Error installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The level string is not a valid filter directive.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Filter that failed to parse.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` if the configured level does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.level.clone(),
        message: e.to_string(),
    })
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = if config.format == "pretty" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .with_target(false)
            .pretty()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .json()
            .with_current_span(config.include_spans)
            .try_init()
    };

    result.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::info!(
        level = %config.level,
        format = %config.format,
        "Tracing initialized"
    );
    Ok(())
}
