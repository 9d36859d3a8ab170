//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::{Config, PolicyConfig};

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.reconnect.tick_interval_ms == 0 {
        errors.push("reconnect.tick_interval_ms must be greater than 0".to_string());
    }

    let policy = &config.reconnect.policy;
    let kind = policy.kind.to_lowercase();
    if !PolicyConfig::KINDS.contains(&kind.as_str()) {
        errors.push(format!(
            "reconnect.policy.kind '{}' is invalid (must be one of {})",
            policy.kind,
            PolicyConfig::KINDS.join(", ")
        ));
    }

    if kind == "exponential" {
        if !policy.multiplier.is_finite() || policy.multiplier < 1.0 {
            errors.push(format!(
                "reconnect.policy.multiplier must be at least 1.0 (got {})",
                policy.multiplier
            ));
        }
        if policy.initial_delay_ms > policy.max_delay_ms {
            errors.push(format!(
                "reconnect.policy.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                policy.initial_delay_ms, policy.max_delay_ms
            ));
        }
    }

    if policy.max_attempts == Some(0) {
        errors.push("reconnect.policy.max_attempts must be at least 1 when set".to_string());
    }

    let rate = config.simulation.success_rate;
    if !(0.0..=1.0).contains(&rate) {
        errors.push(format!(
            "simulation.success_rate must be between 0.0 and 1.0 (got {})",
            rate
        ));
    }
    if config.simulation.name.is_empty() {
        errors.push("simulation.name is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
