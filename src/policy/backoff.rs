//! Exponential backoff reconnection policy.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};

use super::{Decision, RetryContext, RetryPolicy};

/// Configuration for exponential backoff reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Multiplier for each successive attempt.
    pub multiplier: f64,
    /// Maximum number of attempts (None = infinite).
    pub max_attempts: Option<u32>,
    /// Add random jitter on top of each delay.
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: None,
            jitter: false,
        }
    }
}

/// Waits `initial_delay * multiplier^n` before attempt `n + 1`, capped at
/// `max_delay`, and stops once `max_attempts` attempts have failed.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: ReconnectConfig,
    builder: ExponentialBuilder,
}

impl ExponentialBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        let builder = ExponentialBuilder::default()
            .with_min_delay(config.initial_delay)
            .with_max_delay(config.max_delay)
            .with_factor(config.multiplier as f32);
        let builder = match config.max_attempts {
            Some(max) => builder.with_max_times(max as usize),
            None => builder.without_max_times(),
        };
        let builder = if config.jitter {
            builder.with_jitter()
        } else {
            builder
        };

        Self { config, builder }
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Delay scheduled after `attempts` failures, or None once exhausted.
    pub fn delay_for(&self, attempts: u32) -> Option<Duration> {
        self.builder.clone().build().nth(attempts as usize)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn decide(&self, ctx: &RetryContext<'_>) -> Decision {
        self.delay_for(ctx.attempt_count).into()
    }
}
