//! Configuration module for the order router.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before anything is wired.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_router::config::load_config;
//!
//! // Load from default path (config/router.yaml)
//! let config = load_config(None)?;
//!
//! let engine_config = config.routing.to_engine_config();
//! let retry_policy = config.routing.retry.to_policy();
//! ```

mod observability;
mod routing;
mod simulation;
mod solver;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use routing::{RetryConfig, RetryStrategy, RoutingConfig};
pub use simulation::{BehaviourConfig, InstructionConfig, QuoteConfig, SimulationConfig, VenueConfig};
pub use solver::SolverConfig;

/// Default configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "config/router.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Routing engine configuration.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Sweep solver configuration.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Paper-routing simulation.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to [`DEFAULT_CONFIG_PATH`].
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables without a default become the empty string.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let retry = &config.routing.retry;
    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "routing.retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "routing.retry.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ConfigError::ValidationError(
            "routing.retry.initial_backoff_ms must not exceed max_backoff_ms".to_string(),
        ));
    }

    if config.solver.max_venues == 0 {
        return Err(ConfigError::ValidationError(
            "solver.max_venues must be positive".to_string(),
        ));
    }
    if config.solver.min_child_quantity.is_sign_negative() {
        return Err(ConfigError::ValidationError(
            "solver.min_child_quantity must not be negative".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }
    if config.observability.metrics.enabled {
        config.observability.metrics.to_metrics_config()?;
    }

    validate_simulation(&config.simulation)
}

fn validate_simulation(simulation: &SimulationConfig) -> Result<(), ConfigError> {
    let mut venue_ids = HashSet::new();
    for venue in &simulation.venues {
        if venue.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "simulation.venues[].id must not be empty".to_string(),
            ));
        }
        if !venue_ids.insert(venue.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "simulation venue '{}' is declared twice",
                venue.id
            )));
        }
        for behaviour in std::iter::once(&venue.behaviour).chain(&venue.script) {
            if let BehaviourConfig::FillFraction { fraction } = behaviour {
                let fraction = *fraction;
                if fraction <= rust_decimal::Decimal::ZERO || fraction > rust_decimal::Decimal::ONE {
                    return Err(ConfigError::ValidationError(format!(
                        "simulation venue '{}' fill_fraction must be in (0, 1], got {fraction}",
                        venue.id
                    )));
                }
            }
        }
        for quote in &venue.quotes {
            if quote.price <= rust_decimal::Decimal::ZERO || quote.depth.is_sign_negative() {
                return Err(ConfigError::ValidationError(format!(
                    "simulation venue '{}' has an invalid quote for {}",
                    venue.id, quote.instrument
                )));
            }
        }
    }

    let mut instruction_ids = HashSet::new();
    for (index, instruction) in simulation.instructions.iter().enumerate() {
        instruction.to_instruction().map_err(|e| {
            ConfigError::ValidationError(format!("simulation.instructions[{index}]: {e}"))
        })?;
        if let Some(id) = &instruction.id {
            if !instruction_ids.insert(id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "simulation instruction id '{id}' is declared twice"
                )));
            }
        }
    }

    Ok(())
}
