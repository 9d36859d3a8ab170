//! Manager-wide collaborators shared by every scheduler.

use std::fmt;
use std::sync::Arc;

use crate::common::error::ConfigResult;
use crate::common::{KeepAlive, KeepAliveGuard};
use crate::config::types::ReconnectSettings;
use crate::policy::RetryPolicy;

/// Services a scheduler borrows from the owner of all connections.
pub trait Manager: Send + Sync {
    /// Take a reference on the keep-alive lock for the length of an episode.
    fn acquire_keep_alive(&self) -> KeepAliveGuard;

    /// Policy used by connections that don't carry their own.
    fn default_policy(&self) -> Option<&dyn RetryPolicy>;
}

/// Standard [`Manager`]: one keep-alive lock and an optional default policy.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    keep_alive: KeepAlive,
    default_policy: Option<Arc<dyn RetryPolicy>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_policy(self, policy: impl RetryPolicy + 'static) -> Self {
        self.with_shared_policy(Arc::new(policy))
    }

    pub fn with_shared_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.default_policy = Some(policy);
        self
    }

    /// Build a manager whose default policy comes from configuration.
    pub fn from_config(settings: &ReconnectSettings) -> ConfigResult<Self> {
        let policy = settings.policy.build()?;
        Ok(Self::new().with_shared_policy(policy))
    }

    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("keep_alive", &self.keep_alive)
            .field("has_default_policy", &self.default_policy.is_some())
            .finish()
    }
}

impl Manager for ConnectionManager {
    fn acquire_keep_alive(&self) -> KeepAliveGuard {
        self.keep_alive.acquire()
    }

    fn default_policy(&self) -> Option<&dyn RetryPolicy> {
        self.default_policy.as_deref()
    }
}
