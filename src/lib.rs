//! Relink - per-connection reconnection scheduling.
//!
//! A [`ReconnectScheduler`] decides, after a connection attempt fails or a
//! link drops, whether and when to try again. The decision is delegated to a
//! pluggable [`RetryPolicy`]; the scheduler itself is driven by periodic
//! `tick` calls from its owner and runs no timers of its own.
//!
//! ## Module Structure
//!
//! - `common`: shared types, errors and the keep-alive lock
//! - `config`: HOCON configuration, environment overrides and validation
//! - `policy`: the policy interface and built-in policies
//! - `reconnect`: connection/manager interfaces and the scheduler

pub mod common;
pub mod config;
pub mod policy;
pub mod reconnect;

pub use common::{ConnectivityState, FailureInfo, FailureReason, KeepAlive, KeepAliveGuard};
pub use policy::{Decision, RetryContext, RetryPolicy};
pub use reconnect::{Connection, ConnectionManager, Manager, ReconnectScheduler, TickOutcome};
