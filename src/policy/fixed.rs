//! Fixed-interval reconnection policy.

use std::time::Duration;

use super::{Decision, RetryContext, RetryPolicy};

/// Retries at a steady rate until a time or attempt budget runs out.
///
/// With `first_immediate` set, the first attempt of an episode is scheduled
/// with zero delay (it still waits for the next tick).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInterval {
    pub delay: Duration,
    pub timeout: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub first_immediate: bool,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timeout: None,
            max_attempts: None,
            first_immediate: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn first_immediate(mut self) -> Self {
        self.first_immediate = true;
        self
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
            .with_timeout(Duration::from_secs(30))
            .first_immediate()
    }
}

impl RetryPolicy for FixedInterval {
    fn decide(&self, ctx: &RetryContext<'_>) -> Decision {
        if ctx.attempt_count == 0 && self.first_immediate {
            return Decision::retry_now();
        }
        if self.max_attempts.is_some_and(|max| ctx.attempt_count >= max) {
            return Decision::Stop;
        }
        if self.timeout.is_some_and(|timeout| ctx.total_elapsed >= timeout) {
            return Decision::Stop;
        }
        Decision::retry_in(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(attempt_count: u32, total_secs: u64) -> RetryContext<'static> {
        RetryContext {
            entity: "fixed",
            attempt_count,
            total_elapsed: Duration::from_secs(total_secs),
            previous_delay: Duration::ZERO,
            failure: None,
        }
    }

    #[test]
    fn test_default_retries_instantly_first() {
        let policy = FixedInterval::default();
        assert_eq!(policy.decide(&ctx(0, 0)), Decision::retry_now());
        assert_eq!(
            policy.decide(&ctx(1, 1)),
            Decision::Retry(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_stops_after_timeout() {
        let policy = FixedInterval::new(Duration::from_secs(2)).with_timeout(Duration::from_secs(10));
        assert!(!policy.decide(&ctx(4, 9)).is_stop());
        assert!(policy.decide(&ctx(5, 10)).is_stop());
    }

    #[test]
    fn test_stops_after_max_attempts() {
        let policy = FixedInterval::new(Duration::from_secs(1)).with_max_attempts(3);
        assert!(!policy.decide(&ctx(0, 0)).is_stop());
        assert!(!policy.decide(&ctx(2, 0)).is_stop());
        assert!(policy.decide(&ctx(3, 0)).is_stop());
    }

    #[test]
    fn test_without_limits_never_stops() {
        let policy = FixedInterval::new(Duration::from_millis(500));
        assert_eq!(
            policy.decide(&ctx(1000, 100_000)),
            Decision::Retry(Duration::from_millis(500))
        );
    }
}
