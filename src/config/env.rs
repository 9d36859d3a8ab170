//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `RELINK_POLICY` - Retry policy kind
//! - `RELINK_INITIAL_DELAY_MS` - First (or fixed) delay in milliseconds
//! - `RELINK_MAX_DELAY_MS` - Backoff cap in milliseconds
//! - `RELINK_MAX_ATTEMPTS` - Attempt budget per episode
//! - `RELINK_TICK_INTERVAL_MS` - Scheduler tick interval

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "RELINK";

/// Apply environment variable overrides to a config.
///
/// Values that fail to parse are logged and ignored.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(kind) = env::var(format!("{}_POLICY", ENV_PREFIX)) {
        config.reconnect.policy.kind = kind;
    }

    if let Some(ms) = parse_var("INITIAL_DELAY_MS") {
        config.reconnect.policy.initial_delay_ms = ms;
    }
    if let Some(ms) = parse_var("MAX_DELAY_MS") {
        config.reconnect.policy.max_delay_ms = ms;
    }
    if let Some(max) = parse_var("MAX_ATTEMPTS") {
        config.reconnect.policy.max_attempts = Some(max);
    }
    if let Some(ms) = parse_var("TICK_INTERVAL_MS") {
        config.reconnect.tick_interval_ms = ms;
    }

    config
}

fn parse_var<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    let name = format!("{}_{}", ENV_PREFIX, suffix);
    let value = env::var(&name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}: '{}' is not a valid number", name, value);
            None
        }
    }
}

/// Get the config file path from environment or use default.
///
/// Checks `RELINK_CONFIG` environment variable, otherwise returns "relink.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "relink.conf".to_string())
}
