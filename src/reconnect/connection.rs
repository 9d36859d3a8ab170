//! The connection entity a scheduler works on behalf of.

use crate::common::ConnectivityState;
use crate::policy::RetryPolicy;

/// A connection that can be retried.
///
/// The transport behind it is opaque to the scheduler: all it needs is the
/// current state and a way to kick off another attempt.
pub trait Connection {
    /// Name used in logs and handed to retry policies.
    fn name(&self) -> &str;

    fn state(&self) -> ConnectivityState;

    /// Start a reconnect attempt. Fire-and-forget; the outcome is reported
    /// back through the scheduler by the owner.
    fn attempt_reconnect(&mut self);

    /// Per-connection policy override.
    fn retry_policy(&self) -> Option<&dyn RetryPolicy> {
        None
    }
}
