//! Shared connection types.

use std::fmt;

/// Connectivity state reported by a connection entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    /// Fully disconnected; the only state in which reconnect time accrues.
    Disconnected,
    /// An attempt is in flight.
    Connecting,
    /// Link is up.
    Connected,
    /// Link is being torn down.
    Disconnecting,
}

impl ConnectivityState {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The attempt did not complete in time.
    Timeout,
    /// The remote end refused the connection.
    Refused,
    /// An established link dropped.
    Dropped,
    /// The remote end accepted the link but rejected the session.
    Rejected,
    Other,
}

impl FailureReason {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Refused => "refused",
            Self::Dropped => "dropped",
            Self::Rejected => "rejected",
            Self::Other => "other",
        }
    }
}

/// Diagnostic information about a failed attempt.
///
/// Passed through untouched from the caller to the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub reason: FailureReason,
    pub detail: Option<String>,
}

impl FailureInfo {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.reason.name(), detail),
            None => f.write_str(self.reason.name()),
        }
    }
}
