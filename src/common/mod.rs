//! Common utilities and types shared across the crate.

pub mod error;
pub mod keep_alive;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use keep_alive::{KeepAlive, KeepAliveGuard};
pub use types::{ConnectivityState, FailureInfo, FailureReason};
