//! Connection supervisor
//!
//! Tracks in-flight connection tasks so shutdown can wait for them to drain.
//! Owned by the acceptor and passed by reference into each session task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Registry of in-flight connection tasks.
#[derive(Debug, Default)]
pub struct ConnectionSupervisor {
    active: AtomicUsize,
    drained: Notify,
}

impl ConnectionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight connection. The returned guard deregisters
    /// on drop regardless of which exit path the session takes.
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::AcqRel);
        ConnectionGuard {
            supervisor: Arc::clone(self),
        }
    }

    /// Number of connections currently in flight.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Wait until every registered connection has deregistered.
    pub async fn await_drain(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII registration for one connection task.
pub struct ConnectionGuard {
    supervisor: Arc<ConnectionSupervisor>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.supervisor.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.supervisor.drained.notify_waiters();
        }
    }
}
