//! Per-connection reconnect scheduler.
//!
//! The scheduler is armed with [`ReconnectScheduler::start`] when a
//! connection drops and is then driven by periodic [`ReconnectScheduler::tick`]
//! calls from its owner. Once the connection has been disconnected for the
//! delay chosen by the retry policy, the scheduler asks the connection to
//! reconnect. Failed attempts are reported back through
//! [`ReconnectScheduler::on_attempt_failed`], which asks the policy for the
//! next delay or ends the episode.
//!
//! A keep-alive guard is held for as long as an episode runs and is dropped
//! on every transition back to idle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::common::{FailureInfo, KeepAliveGuard};
use crate::policy::{Decision, RetryContext, RetryPolicy, StopPolicy};

use super::connection::Connection;
use super::manager::Manager;

/// What a call to [`ReconnectScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Scheduler is not running.
    Idle,
    /// Connection is not disconnected; only the episode clock advanced.
    Suspended,
    /// Still waiting for the scheduled delay.
    Waiting,
    /// The reconnect attempt was triggered on this tick.
    Fired,
}

/// State of one running episode.
#[derive(Debug)]
struct Episode {
    attempts: u32,
    total_elapsed: Duration,
    delay: Duration,
    since_attempt: Duration,
    /// Set once the attempt for the current delay has been triggered.
    fired: bool,
    keep_alive: KeepAliveGuard,
}

#[derive(Debug)]
enum State {
    Idle,
    Running(Episode),
}

/// Decides whether and when a single connection is retried.
///
/// Calls are expected to be serialized by the owning connection.
pub struct ReconnectScheduler {
    manager: Arc<dyn Manager>,
    state: State,
}

impl ReconnectScheduler {
    pub fn new(manager: Arc<dyn Manager>) -> Self {
        Self {
            manager,
            state: State::Idle,
        }
    }

    /// Begin a new episode with fresh counters.
    ///
    /// The policy is consulted right away for the first delay. If it declines,
    /// the scheduler stays idle and the keep-alive is released again. A zero
    /// delay still waits for the next tick before attempting.
    pub fn start(&mut self, conn: &dyn Connection) {
        let keep_alive = match std::mem::replace(&mut self.state, State::Idle) {
            State::Running(episode) => episode.keep_alive,
            State::Idle => self.manager.acquire_keep_alive(),
        };

        let ctx = RetryContext {
            entity: conn.name(),
            attempt_count: 0,
            total_elapsed: Duration::ZERO,
            previous_delay: Duration::ZERO,
            failure: None,
        };

        match decide(self.manager.as_ref(), conn, &ctx) {
            Decision::Retry(delay) => {
                debug!(
                    "Reconnect episode started for {}, first attempt in {:.1} seconds",
                    conn.name(),
                    delay.as_secs_f64()
                );
                self.state = State::Running(Episode {
                    attempts: 0,
                    total_elapsed: Duration::ZERO,
                    delay,
                    since_attempt: Duration::ZERO,
                    fired: false,
                    keep_alive,
                });
            }
            Decision::Stop => {
                info!("Retry policy declined to reconnect {}", conn.name());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Record a failed attempt and schedule the next one.
    ///
    /// Returns `false` if the scheduler was not running or the policy gave up,
    /// in which case the scheduler is stopped.
    pub fn on_attempt_failed(&mut self, conn: &dyn Connection, failure: &FailureInfo) -> bool {
        let State::Running(episode) = &mut self.state else {
            return false;
        };

        episode.attempts += 1;
        episode.since_attempt = Duration::ZERO;
        episode.fired = false;

        let ctx = RetryContext {
            entity: conn.name(),
            attempt_count: episode.attempts,
            total_elapsed: episode.total_elapsed,
            previous_delay: episode.delay,
            failure: Some(failure),
        };

        match decide(self.manager.as_ref(), conn, &ctx) {
            Decision::Retry(delay) => {
                episode.delay = delay;
                info!(
                    "Reconnecting {} in {:.1} seconds (attempt {} failed: {})",
                    conn.name(),
                    delay.as_secs_f64(),
                    episode.attempts,
                    failure
                );
                true
            }
            Decision::Stop => {
                warn!(
                    "Giving up on {} after {} failed attempts (last: {})",
                    conn.name(),
                    episode.attempts,
                    failure
                );
                self.stop();
                false
            }
        }
    }

    /// Advance the scheduler by `step`.
    ///
    /// Episode time always advances while running. Time toward the next
    /// attempt only accrues while the connection is disconnected, and the
    /// attempt is triggered once per scheduled delay.
    pub fn tick(&mut self, conn: &mut dyn Connection, step: Duration) -> TickOutcome {
        let State::Running(episode) = &mut self.state else {
            return TickOutcome::Idle;
        };

        episode.total_elapsed = episode.total_elapsed.saturating_add(step);

        if !conn.state().is_disconnected() {
            return TickOutcome::Suspended;
        }

        episode.since_attempt = episode.since_attempt.saturating_add(step);

        if episode.fired || episode.since_attempt < episode.delay {
            return TickOutcome::Waiting;
        }

        episode.fired = true;
        info!(
            "Attempting reconnect of {} (attempt {})",
            conn.name(),
            episode.attempts + 1
        );
        conn.attempt_reconnect();
        TickOutcome::Fired
    }

    /// End the episode and release the keep-alive. No-op when idle.
    pub fn stop(&mut self) {
        if let State::Running(episode) = std::mem::replace(&mut self.state, State::Idle) {
            debug!(
                "Reconnect episode stopped after {} failed attempts over {:.1} seconds",
                episode.attempts,
                episode.total_elapsed.as_secs_f64()
            );
        }
    }

    /// Failed attempts in the current episode.
    pub fn attempt_count(&self) -> u32 {
        match &self.state {
            State::Running(episode) => episode.attempts,
            State::Idle => 0,
        }
    }

    /// Time since the current episode started.
    pub fn total_elapsed(&self) -> Duration {
        match &self.state {
            State::Running(episode) => episode.total_elapsed,
            State::Idle => Duration::ZERO,
        }
    }

    /// Delay scheduled before the next attempt.
    pub fn current_delay(&self) -> Option<Duration> {
        match &self.state {
            State::Running(episode) => Some(episode.delay),
            State::Idle => None,
        }
    }

    /// Disconnected time since the episode started or the last attempt
    /// failed. `None` when idle.
    pub fn elapsed_since_attempt(&self) -> Option<Duration> {
        match &self.state {
            State::Running(episode) => Some(episode.since_attempt),
            State::Idle => None,
        }
    }
}

impl fmt::Debug for ReconnectScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectScheduler")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Resolve the effective policy and ask it for a decision.
///
/// Lookup order: the connection's own policy, then the manager default,
/// then [`StopPolicy`].
fn decide(manager: &dyn Manager, conn: &dyn Connection, ctx: &RetryContext<'_>) -> Decision {
    let policy: &dyn RetryPolicy = conn
        .retry_policy()
        .or_else(|| manager.default_policy())
        .unwrap_or(&StopPolicy);
    policy.decide(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ConnectivityState, FailureReason};
    use crate::reconnect::ConnectionManager;
    use std::sync::Mutex;

    struct MockConnection {
        state: ConnectivityState,
        reconnects: u32,
        policy: Option<Box<dyn RetryPolicy>>,
    }

    impl MockConnection {
        fn disconnected() -> Self {
            Self {
                state: ConnectivityState::Disconnected,
                reconnects: 0,
                policy: None,
            }
        }

        fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
            self.policy = Some(Box::new(policy));
            self
        }
    }

    impl Connection for MockConnection {
        fn name(&self) -> &str {
            "mock"
        }

        fn state(&self) -> ConnectivityState {
            self.state
        }

        fn attempt_reconnect(&mut self) {
            self.reconnects += 1;
        }

        fn retry_policy(&self) -> Option<&dyn RetryPolicy> {
            self.policy.as_deref()
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn every(delay: Duration) -> impl RetryPolicy {
        move |_: &RetryContext<'_>| Decision::retry_in(delay)
    }

    fn setup(policy: impl RetryPolicy + 'static) -> (Arc<ConnectionManager>, ReconnectScheduler) {
        let manager = Arc::new(ConnectionManager::new().with_default_policy(policy));
        let scheduler = ReconnectScheduler::new(manager.clone());
        (manager, scheduler)
    }

    fn failure() -> FailureInfo {
        FailureInfo::new(FailureReason::Timeout)
    }

    #[test]
    fn test_start_arms_scheduler() {
        let (manager, mut scheduler) = setup(every(secs(2)));
        let conn = MockConnection::disconnected();

        scheduler.start(&conn);

        assert!(scheduler.is_running());
        assert_eq!(scheduler.current_delay(), Some(secs(2)));
        assert_eq!(scheduler.elapsed_since_attempt(), Some(Duration::ZERO));
        assert_eq!(scheduler.attempt_count(), 0);
        assert_eq!(manager.keep_alive().outstanding(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (manager, mut scheduler) = setup(every(secs(1)));
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        scheduler.tick(&mut conn, secs(1));
        scheduler.on_attempt_failed(&conn, &failure());

        scheduler.stop();
        scheduler.stop();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.attempt_count(), 0);
        assert_eq!(scheduler.total_elapsed(), Duration::ZERO);
        assert_eq!(scheduler.elapsed_since_attempt(), None);
        assert_eq!(manager.keep_alive().outstanding(), 0);
        assert_eq!(manager.keep_alive().total_acquired(), 1);
    }

    #[test]
    fn test_stop_when_never_started() {
        let (manager, mut scheduler) = setup(every(secs(1)));
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(manager.keep_alive().total_acquired(), 0);
    }

    #[test]
    fn test_running_matches_elapsed_since_attempt() {
        let (_manager, mut scheduler) = setup(|ctx: &RetryContext<'_>| {
            if ctx.attempt_count < 2 {
                Decision::retry_in(Duration::from_millis(500))
            } else {
                Decision::Stop
            }
        });
        let mut conn = MockConnection::disconnected();

        let check = |s: &ReconnectScheduler| {
            assert_eq!(s.is_running(), s.elapsed_since_attempt().is_some());
        };

        check(&scheduler);
        scheduler.start(&conn);
        check(&scheduler);
        scheduler.tick(&mut conn, Duration::from_millis(300));
        check(&scheduler);
        scheduler.on_attempt_failed(&conn, &failure());
        check(&scheduler);
        scheduler.on_attempt_failed(&conn, &failure());
        check(&scheduler);
        assert!(!scheduler.is_running());
        scheduler.tick(&mut conn, Duration::from_millis(300));
        check(&scheduler);
        scheduler.stop();
        check(&scheduler);
    }

    #[test]
    fn test_policy_stop_on_start_leaves_idle() {
        let (manager, mut scheduler) = setup(StopPolicy);
        let conn = MockConnection::disconnected();

        scheduler.start(&conn);

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.current_delay(), None);
        assert_eq!(manager.keep_alive().total_acquired(), 1);
        assert_eq!(manager.keep_alive().outstanding(), 0);
    }

    #[test]
    fn test_no_policy_anywhere_means_no_retries() {
        let manager = Arc::new(ConnectionManager::new());
        let mut scheduler = ReconnectScheduler::new(manager.clone());
        let conn = MockConnection::disconnected();

        scheduler.start(&conn);

        assert!(!scheduler.is_running());
        assert_eq!(manager.keep_alive().outstanding(), 0);
    }

    #[test]
    fn test_connection_policy_overrides_default() {
        let (_manager, mut scheduler) = setup(every(secs(10)));
        let conn = MockConnection::disconnected().with_policy(every(secs(3)));

        scheduler.start(&conn);
        assert_eq!(scheduler.current_delay(), Some(secs(3)));
    }

    #[test]
    fn test_invalid_policy_value_stops() {
        let (manager, mut scheduler) = setup(|ctx: &RetryContext<'_>| {
            if ctx.is_initial() {
                Decision::from_secs_f64(1.0)
            } else {
                Decision::from_secs_f64(f64::NAN)
            }
        });
        let conn = MockConnection::disconnected();

        scheduler.start(&conn);
        assert!(scheduler.is_running());
        assert!(!scheduler.on_attempt_failed(&conn, &failure()));
        assert!(!scheduler.is_running());
        assert_eq!(manager.keep_alive().outstanding(), 0);
    }

    #[test]
    fn test_no_fire_while_connected() {
        let (_manager, mut scheduler) = setup(|_: &RetryContext<'_>| Decision::retry_now());
        let mut conn = MockConnection::disconnected();
        scheduler.start(&conn);

        for state in [
            ConnectivityState::Connected,
            ConnectivityState::Connecting,
            ConnectivityState::Disconnecting,
        ] {
            conn.state = state;
            for _ in 0..5 {
                assert_eq!(
                    scheduler.tick(&mut conn, Duration::from_millis(100)),
                    TickOutcome::Suspended
                );
            }
        }

        assert_eq!(conn.reconnects, 0);
        assert_eq!(scheduler.total_elapsed(), Duration::from_millis(1500));
        assert_eq!(scheduler.elapsed_since_attempt(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_delay_waits_for_tick() {
        let (_manager, mut scheduler) = setup(|_: &RetryContext<'_>| Decision::retry_now());
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        assert_eq!(conn.reconnects, 0);

        assert_eq!(scheduler.tick(&mut conn, Duration::ZERO), TickOutcome::Fired);
        assert_eq!(conn.reconnects, 1);
    }

    #[test]
    fn test_threshold_crossing_fires_once() {
        let (_manager, mut scheduler) = setup(every(secs(5)));
        let mut conn = MockConnection::disconnected();
        scheduler.start(&conn);

        assert_eq!(
            scheduler.tick(&mut conn, Duration::from_millis(4900)),
            TickOutcome::Waiting
        );
        assert_eq!(conn.reconnects, 0);
        assert_eq!(
            scheduler.tick(&mut conn, Duration::from_millis(200)),
            TickOutcome::Fired
        );
        assert_eq!(conn.reconnects, 1);

        assert_eq!(scheduler.tick(&mut conn, secs(1)), TickOutcome::Waiting);
        assert_eq!(conn.reconnects, 1);
    }

    #[test]
    fn test_disconnected_time_only_counts_toward_delay() {
        let (_manager, mut scheduler) = setup(every(secs(2)));
        let mut conn = MockConnection::disconnected();
        scheduler.start(&conn);

        scheduler.tick(&mut conn, secs(1));
        conn.state = ConnectivityState::Connecting;
        scheduler.tick(&mut conn, secs(5));
        conn.state = ConnectivityState::Disconnected;

        assert_eq!(scheduler.elapsed_since_attempt(), Some(secs(1)));
        assert_eq!(scheduler.total_elapsed(), secs(6));
        assert_eq!(scheduler.tick(&mut conn, secs(1)), TickOutcome::Fired);
    }

    #[test]
    fn test_backoff_propagation() {
        let (_manager, mut scheduler) = setup(|ctx: &RetryContext<'_>| {
            Decision::retry_in(Duration::from_secs(ctx.attempt_count as u64))
        });
        let conn = MockConnection::disconnected();
        scheduler.start(&conn);

        let mut delays = Vec::new();
        for _ in 0..3 {
            assert!(scheduler.on_attempt_failed(&conn, &failure()));
            delays.push(scheduler.current_delay().unwrap());
        }

        assert_eq!(delays, vec![secs(1), secs(2), secs(3)]);
    }

    #[test]
    fn test_policy_sees_full_context() {
        let seen: Arc<Mutex<Vec<(u32, Duration, Duration, Option<FailureReason>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let (_manager, mut scheduler) = setup(move |ctx: &RetryContext<'_>| {
            assert_eq!(ctx.entity, "mock");
            record.lock().unwrap().push((
                ctx.attempt_count,
                ctx.total_elapsed,
                ctx.previous_delay,
                ctx.failure.map(|f| f.reason),
            ));
            Decision::retry_in(Duration::from_secs(2))
        });
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        scheduler.tick(&mut conn, secs(2));
        scheduler.on_attempt_failed(&conn, &FailureInfo::new(FailureReason::Refused));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (0, Duration::ZERO, Duration::ZERO, None));
        assert_eq!(seen[1], (1, secs(2), secs(2), Some(FailureReason::Refused)));
    }

    #[test]
    fn test_episode_reset_on_restart() {
        let (manager, mut scheduler) = setup(every(secs(1)));
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        scheduler.tick(&mut conn, secs(1));
        scheduler.on_attempt_failed(&conn, &failure());
        scheduler.tick(&mut conn, secs(1));
        scheduler.on_attempt_failed(&conn, &failure());
        assert_eq!(scheduler.attempt_count(), 2);
        assert_eq!(scheduler.total_elapsed(), secs(2));

        scheduler.stop();
        scheduler.start(&conn);

        assert_eq!(scheduler.attempt_count(), 0);
        assert_eq!(scheduler.total_elapsed(), Duration::ZERO);
        assert_eq!(manager.keep_alive().outstanding(), 1);
        assert_eq!(manager.keep_alive().total_acquired(), 2);
    }

    #[test]
    fn test_restart_while_running_keeps_single_keep_alive() {
        let (manager, mut scheduler) = setup(every(secs(1)));
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        scheduler.tick(&mut conn, Duration::from_millis(500));
        scheduler.start(&conn);

        assert_eq!(scheduler.total_elapsed(), Duration::ZERO);
        assert_eq!(manager.keep_alive().outstanding(), 1);
        assert_eq!(manager.keep_alive().total_acquired(), 1);
    }

    #[test]
    fn test_failed_attempt_when_idle_is_ignored() {
        let (manager, mut scheduler) = setup(every(secs(1)));
        let mut conn = MockConnection::disconnected();

        assert!(!scheduler.on_attempt_failed(&conn, &failure()));
        assert_eq!(scheduler.tick(&mut conn, secs(10)), TickOutcome::Idle);
        assert_eq!(scheduler.attempt_count(), 0);
        assert_eq!(conn.reconnects, 0);
        assert_eq!(manager.keep_alive().total_acquired(), 0);
    }

    #[test]
    fn test_gives_up_on_third_failure() {
        let (manager, mut scheduler) = setup(|ctx: &RetryContext<'_>| {
            if ctx.attempt_count < 3 {
                Decision::retry_in(Duration::from_secs(2))
            } else {
                Decision::Stop
            }
        });
        let mut conn = MockConnection::disconnected();

        scheduler.start(&conn);
        assert!(scheduler.is_running());
        assert_eq!(scheduler.current_delay(), Some(secs(2)));

        for expected in 1..=2 {
            assert_eq!(scheduler.tick(&mut conn, secs(2)), TickOutcome::Fired);
            assert!(scheduler.on_attempt_failed(&conn, &failure()));
            assert_eq!(scheduler.attempt_count(), expected);
            assert_eq!(scheduler.current_delay(), Some(secs(2)));
            assert!(scheduler.is_running());
        }

        assert_eq!(scheduler.tick(&mut conn, secs(2)), TickOutcome::Fired);
        assert!(!scheduler.on_attempt_failed(&conn, &failure()));
        assert!(!scheduler.is_running());
        assert_eq!(conn.reconnects, 3);
        assert_eq!(manager.keep_alive().outstanding(), 0);
    }
}
