//! Configuration type definitions.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::common::error::{ConfigError, ConfigResult};
use crate::policy::{ExponentialBackoff, FixedInterval, ReconnectConfig, RetryPolicy, StopPolicy};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconnect: ReconnectSettings,
    pub simulation: SimulationConfig,
}

/// Scheduler driving settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// How often the owner ticks its schedulers.
    pub tick_interval_ms: u64,
    /// Manager-wide default retry policy.
    pub policy: PolicyConfig,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            policy: PolicyConfig::default(),
        }
    }
}

impl ReconnectSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Retry policy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// "exponential", "fixed" or "stop"
    pub kind: String,
    /// First delay for exponential, the steady delay for fixed.
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
    /// Episode time budget (fixed only).
    pub timeout_ms: Option<u64>,
    pub jitter: bool,
    /// Fixed only: make the first attempt of an episode on the next tick.
    pub first_immediate: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: "exponential".to_string(),
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            max_attempts: None,
            timeout_ms: None,
            jitter: false,
            first_immediate: false,
        }
    }
}

impl PolicyConfig {
    pub const KINDS: [&'static str; 3] = ["exponential", "fixed", "stop"];

    /// Instantiate the configured policy.
    pub fn build(&self) -> ConfigResult<Arc<dyn RetryPolicy>> {
        match self.kind.to_lowercase().as_str() {
            "exponential" => Ok(Arc::new(ExponentialBackoff::new(ReconnectConfig {
                initial_delay: Duration::from_millis(self.initial_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                multiplier: self.multiplier,
                max_attempts: self.max_attempts,
                jitter: self.jitter,
            }))),
            "fixed" => Ok(Arc::new(FixedInterval {
                delay: Duration::from_millis(self.initial_delay_ms),
                timeout: self.timeout_ms.map(Duration::from_millis),
                max_attempts: self.max_attempts,
                first_immediate: self.first_immediate,
            })),
            "stop" => Ok(Arc::new(StopPolicy)),
            other => Err(ConfigError::InvalidValue {
                field: "reconnect.policy.kind".to_string(),
                message: format!(
                    "unknown policy '{}', expected one of {}",
                    other,
                    Self::KINDS.join(", ")
                ),
            }),
        }
    }
}

/// Settings for the simulated link driven by the demo binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub name: String,
    /// Probability that a reconnect attempt succeeds.
    pub success_rate: f64,
    /// How long the link stays up before dropping again.
    pub uptime_ms: u64,
    /// Stop the simulation after this long (None = until Ctrl+C).
    pub run_for_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "link-1".to_string(),
            success_rate: 0.3,
            uptime_ms: 3_000,
            run_for_ms: None,
        }
    }
}
