//! Retry policies.
//!
//! A [`RetryPolicy`] maps a [`RetryContext`] to a [`Decision`]: wait some
//! time and try again, or give up. Policies are consulted once when an
//! episode starts and once after every failed attempt.

pub mod backoff;
pub mod fixed;

use std::time::Duration;

use crate::common::FailureInfo;

pub use backoff::{ExponentialBackoff, ReconnectConfig};
pub use fixed::FixedInterval;

/// Read-only snapshot handed to a policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    /// Name of the connection being retried.
    pub entity: &'a str,
    /// Failed attempts so far in this episode.
    pub attempt_count: u32,
    /// Time since the episode started.
    pub total_elapsed: Duration,
    /// The delay that was scheduled before this request.
    pub previous_delay: Duration,
    /// Why the last attempt failed. `None` when the episode is just starting.
    pub failure: Option<&'a FailureInfo>,
}

impl RetryContext<'_> {
    /// Whether this is the initial request of an episode.
    pub fn is_initial(&self) -> bool {
        self.failure.is_none()
    }
}

/// What a policy wants the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Try again once this much disconnected time has passed.
    Retry(Duration),
    /// No more attempts.
    Stop,
}

impl Decision {
    pub fn retry_in(delay: Duration) -> Self {
        Self::Retry(delay)
    }

    /// Retry on the next tick.
    pub fn retry_now() -> Self {
        Self::Retry(Duration::ZERO)
    }

    pub fn stop() -> Self {
        Self::Stop
    }

    /// Build a decision from seconds. Negative, NaN and infinite values mean
    /// stop.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs >= 0.0 {
            Duration::try_from_secs_f64(secs)
                .map(Self::Retry)
                .unwrap_or(Self::Stop)
        } else {
            Self::Stop
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry(delay) => Some(*delay),
            Self::Stop => None,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<Option<Duration>> for Decision {
    fn from(delay: Option<Duration>) -> Self {
        delay.map(Self::Retry).unwrap_or(Self::Stop)
    }
}

/// Strategy deciding whether and when to retry a connection.
pub trait RetryPolicy: Send + Sync {
    fn decide(&self, ctx: &RetryContext<'_>) -> Decision;
}

impl<F> RetryPolicy for F
where
    F: Fn(&RetryContext<'_>) -> Decision + Send + Sync,
{
    fn decide(&self, ctx: &RetryContext<'_>) -> Decision {
        self(ctx)
    }
}

/// Never retries. Used when no policy is configured anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopPolicy;

impl RetryPolicy for StopPolicy {
    fn decide(&self, _ctx: &RetryContext<'_>) -> Decision {
        Decision::Stop
    }
}
