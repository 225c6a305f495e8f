//! Single-flight coordination for access-token refresh.
//!
//! DESIGN
//! ======
//! Two states: Idle and Refreshing. The first request to observe a 401 while
//! Idle becomes the leader and holds a [`RefreshLease`]; every request that
//! observes a 401 while Refreshing parks on a oneshot continuation in the
//! pending queue. Settling the lease flips back to Idle and drains the queue
//! under the same lock, so no waiter can be enqueued after the drain and
//! then left behind.
//!
//! The flag lives behind a `std::sync::Mutex` rather than a bare bool: the
//! client may run on a multi-threaded runtime, and check-and-set has to be
//! one step. The lock is never held across an `.await`.
//!
//! Dropping an unsettled lease (leader panicked or its future was cancelled)
//! releases the flag and rejects the waiters with [`RefreshError::Abandoned`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::RefreshError;

/// New access token, or the reason there is none.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh flag plus the queue of requests waiting on it. One per client
/// instance; clones of the client share it.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of [`RefreshCoordinator::begin`].
pub enum RefreshTicket<'a> {
    /// Caller must perform the refresh and settle the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is already in flight; await its outcome.
    Waiter(RefreshWaiter),
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the protocol: become the leader if Idle, otherwise enqueue.
    pub fn begin(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            debug!(waiters = state.pending.len(), "refresh in flight; request queued");
            RefreshTicket::Waiter(RefreshWaiter { rx })
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshLease { coordinator: self, settled: false })
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of requests parked on the current refresh.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let pending = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };
        let count = pending.len();
        for tx in pending {
            // A waiter whose caller went away has dropped its receiver.
            let _ = tx.send(outcome.clone());
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("pending", &state.pending.len())
            .finish()
    }
}

// =============================================================================
// LEASE
// =============================================================================

/// Proof that the holder is the one in-flight refresh.
#[must_use = "dropping a lease abandons the refresh and rejects all waiters"]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Return to Idle and hand `outcome` to every waiter. Returns the number
    /// of waiters released.
    pub fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.release(outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let released = self.coordinator.release(&Err(RefreshError::Abandoned));
            debug!(waiters = released, "refresh lease dropped before settling");
        }
    }
}

// =============================================================================
// WAITER
// =============================================================================

pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Suspend until the in-flight refresh settles.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
