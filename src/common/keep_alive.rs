//! Reference-counted keep-alive lock.
//!
//! Holding a [`KeepAliveGuard`] keeps the host from suspending background
//! work while retries are pending. The lock is released when the last
//! guard is dropped.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

#[derive(Debug, Default)]
struct Counters {
    outstanding: AtomicUsize,
    acquired: AtomicU64,
}

/// Shared keep-alive lock. Clones refer to the same counter.
#[derive(Debug, Clone, Default)]
pub struct KeepAlive {
    counters: Arc<Counters>,
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference on the lock.
    pub fn acquire(&self) -> KeepAliveGuard {
        let held = self.counters.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        trace!("Keep-alive acquired ({} held)", held);
        KeepAliveGuard {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Number of guards currently alive.
    pub fn outstanding(&self) -> usize {
        self.counters.outstanding.load(Ordering::Acquire)
    }

    /// Whether anything currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.outstanding() > 0
    }

    /// Total acquisitions over the lifetime of the lock.
    pub fn total_acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::Relaxed)
    }
}

/// One reference on a [`KeepAlive`]. Released exactly once, on drop.
#[derive(Debug)]
#[must_use = "dropping the guard releases the keep-alive immediately"]
pub struct KeepAliveGuard {
    counters: Arc<Counters>,
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        let held = self.counters.outstanding.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!("Keep-alive released ({} held)", held);
    }
}
