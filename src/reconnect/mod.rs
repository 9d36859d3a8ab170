//! Reconnection scheduling.
//!
//! - `connection`: the [`Connection`] trait implemented by retried links
//! - `manager`: manager-wide keep-alive and default policy
//! - `scheduler`: the per-connection [`ReconnectScheduler`]

pub mod connection;
pub mod manager;
pub mod scheduler;

pub use connection::Connection;
pub use manager::{ConnectionManager, Manager};
pub use scheduler::{ReconnectScheduler, TickOutcome};
