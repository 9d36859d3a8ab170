//! Simulated link used by the demo binary.
//!
//! The link resolves an in-flight attempt on the tick after it was
//! triggered, succeeding with the configured probability. Once up, it stays
//! connected for `uptime_ms` and then drops, which starts a new episode.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{info, warn};

use relink::config::{Config, SimulationConfig};
use relink::{
    Connection, ConnectivityState, FailureInfo, FailureReason, Manager, ReconnectScheduler,
};

/// Counters reported when the simulation ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimSummary {
    pub episodes: u32,
    pub attempts: u32,
    pub connects: u32,
}

/// Why the simulation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimExit {
    /// The retry policy gave up while the link was down.
    GaveUp,
    /// `run_for_ms` elapsed.
    TimeUp,
    Shutdown,
}

pub struct SimulatedLink {
    name: String,
    state: ConnectivityState,
    success_rate: f64,
    rng: StdRng,
}

impl SimulatedLink {
    pub fn new(config: &SimulationConfig, rng: StdRng) -> Self {
        Self {
            name: config.name.clone(),
            state: ConnectivityState::Disconnected,
            success_rate: config.success_rate,
            rng,
        }
    }

    /// Settle an in-flight attempt. Returns None if nothing was in flight.
    fn resolve(&mut self) -> Option<Result<(), FailureInfo>> {
        if self.state != ConnectivityState::Connecting {
            return None;
        }

        if self.rng.gen_bool(self.success_rate) {
            self.state = ConnectivityState::Connected;
            Some(Ok(()))
        } else {
            self.state = ConnectivityState::Disconnected;
            let reason = if self.rng.gen_bool(0.5) {
                FailureReason::Timeout
            } else {
                FailureReason::Refused
            };
            Some(Err(FailureInfo::new(reason).with_detail("simulated")))
        }
    }

    fn drop_link(&mut self) {
        self.state = ConnectivityState::Disconnected;
    }
}

impl Connection for SimulatedLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectivityState {
        self.state
    }

    fn attempt_reconnect(&mut self) {
        self.state = ConnectivityState::Connecting;
    }
}

/// A link together with the scheduler that owns its retries.
pub struct Device {
    link: SimulatedLink,
    reconnect: ReconnectScheduler,
    uptime: Duration,
    connected_for: Duration,
    summary: SimSummary,
}

impl Device {
    pub fn new(link: SimulatedLink, manager: Arc<dyn Manager>, uptime: Duration) -> Self {
        Self {
            link,
            reconnect: ReconnectScheduler::new(manager),
            uptime,
            connected_for: Duration::ZERO,
            summary: SimSummary::default(),
        }
    }

    fn begin_episode(&mut self) {
        self.summary.episodes += 1;
        self.reconnect.start(&self.link);
    }

    /// Advance by one tick. Returns false once the link is down for good.
    fn step(&mut self, dt: Duration) -> bool {
        match self.link.resolve() {
            Some(Ok(())) => {
                self.summary.attempts += 1;
                self.summary.connects += 1;
                self.connected_for = Duration::ZERO;
                info!(
                    "{} connected after {} failed attempts",
                    self.link.name(),
                    self.reconnect.attempt_count()
                );
                self.reconnect.stop();
            }
            Some(Err(failure)) => {
                self.summary.attempts += 1;
                if !self.reconnect.on_attempt_failed(&self.link, &failure) {
                    warn!("{} will stay offline", self.link.name());
                }
            }
            None => {}
        }

        match self.link.state() {
            ConnectivityState::Connected => {
                self.connected_for += dt;
                if self.connected_for >= self.uptime {
                    info!("{} dropped", self.link.name());
                    self.link.drop_link();
                    self.begin_episode();
                }
            }
            _ => {
                self.reconnect.tick(&mut self.link, dt);
            }
        }

        self.reconnect.is_running() || self.link.state() != ConnectivityState::Disconnected
    }

    pub fn summary(&self) -> &SimSummary {
        &self.summary
    }
}

/// Drive a simulated device until the policy gives up, time runs out or
/// shutdown is signalled.
pub async fn run(
    config: &Config,
    manager: Arc<dyn Manager>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> (SimExit, SimSummary) {
    let sim = &config.simulation;
    let link = SimulatedLink::new(sim, StdRng::from_entropy());
    let mut device = Device::new(link, manager, Duration::from_millis(sim.uptime_ms));

    let step = config.reconnect.tick_interval();
    let mut ticker = tokio::time::interval(step);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let run_for = sim.run_for_ms.map(Duration::from_millis);
    let mut elapsed = Duration::ZERO;

    info!("{} is down, starting reconnect loop", sim.name);
    device.begin_episode();

    let exit = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break SimExit::Shutdown;
                }
                continue;
            }
        }

        if !device.step(step) {
            break SimExit::GaveUp;
        }

        elapsed += step;
        if run_for.is_some_and(|limit| elapsed >= limit) {
            break SimExit::TimeUp;
        }
    };

    (exit, device.summary().clone())
}
