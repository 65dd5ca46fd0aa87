//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served
//! - Reject new entries once the shell starts draining
//! - Wake the drain waiter when the count reaches zero
//!
//! # Design Decisions
//! - Counter state lives behind one mutex; the drain check and the release
//!   decrement are serialized, never read from a cached value
//! - Releases are exactly-once per handle; a double release is reported to
//!   the caller and leaves the count untouched
//! - Handles release on drop, so a cancelled request future cannot leak
//!   the count

use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

/// Collaborator-contract violations reported by the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker no longer admits requests.
    #[error("tracker is closed to new requests")]
    Closed,

    /// The handle was already released.
    #[error("request {0} was already released")]
    DoubleRelease(Uuid),
}

#[derive(Debug, Default)]
struct TrackerState {
    active: HashMap<Uuid, Instant>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<TrackerState>,
    drained: Notify,
}

/// Concurrency-safe registry of in-flight requests.
///
/// Cheap to clone; clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    inner: Arc<Inner>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request and return its handle.
    ///
    /// Fails with [`TrackerError::Closed`] once [`close`](Self::close) has
    /// been called; a request admitted before the close is unaffected.
    pub fn enter(&self) -> Result<RequestHandle, TrackerError> {
        let id = Uuid::new_v4();
        let accepted_at = Instant::now();
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.closed {
                return Err(TrackerError::Closed);
            }
            state.active.insert(id, accepted_at);
        }
        Ok(RequestHandle {
            id,
            accepted_at,
            released: AtomicBool::new(false),
            tracker: self.clone(),
        })
    }

    /// Release a handle obtained from [`enter`](Self::enter).
    ///
    /// May be called from a different task or thread than the one that
    /// entered. The second release of the same handle reports
    /// [`TrackerError::DoubleRelease`] and does not touch the count.
    pub fn leave(&self, handle: &RequestHandle) -> Result<(), TrackerError> {
        if handle.released.swap(true, Ordering::AcqRel) {
            return Err(TrackerError::DoubleRelease(handle.id));
        }
        self.release(handle.id);
        Ok(())
    }

    /// Stop admitting new requests.
    pub fn close(&self) {
        self.inner.state.lock().unwrap().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().unwrap().closed
    }

    /// Number of requests currently in flight.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().unwrap().active.len()
    }

    /// Age of the longest-running in-flight request.
    pub fn oldest_in_flight(&self) -> Option<Duration> {
        let state = self.inner.state.lock().unwrap();
        state.active.values().map(Instant::elapsed).max()
    }

    /// Resolves once the active count is zero.
    pub async fn drained(&self) {
        loop {
            // Register for the wakeup before checking the count, otherwise a
            // release between the check and the await is lost.
            let mut notified = pin!(self.inner.drained.notified());
            notified.as_mut().enable();
            if self.inner.state.lock().unwrap().active.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, id: Uuid) {
        let mut state = self.inner.state.lock().unwrap();
        if state.active.remove(&id).is_some() && state.active.is_empty() {
            self.inner.drained.notify_waiters();
        }
    }
}

/// Handle for one in-flight request.
///
/// Released through [`RequestTracker::leave`], or on drop if the owner
/// never released it explicitly.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    accepted_at: Instant,
    released: AtomicBool,
    tracker: RequestTracker,
}

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.tracker.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enter_and_leave_balance_the_count() {
        let tracker = RequestTracker::new();
        let first = tracker.enter().unwrap();
        let second = tracker.enter().unwrap();
        assert_eq!(tracker.active_count(), 2);

        tracker.leave(&first).unwrap();
        assert_eq!(tracker.active_count(), 1);
        tracker.leave(&second).unwrap();
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn double_release_is_reported_and_count_stays_put() {
        let tracker = RequestTracker::new();
        let handle = tracker.enter().unwrap();

        tracker.leave(&handle).unwrap();
        assert_eq!(tracker.active_count(), 0);

        let result = tracker.leave(&handle);
        assert!(matches!(result, Err(TrackerError::DoubleRelease(id)) if id == handle.id()));
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn release_from_another_task_completes_the_drain() {
        let tracker = RequestTracker::new();
        let handle = tracker.enter().unwrap();

        let releaser = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            releaser.leave(&handle).unwrap();
        });

        tracker.drained().await;
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn closed_tracker_rejects_new_entries() {
        let tracker = RequestTracker::new();
        tracker.close();
        assert!(matches!(tracker.enter(), Err(TrackerError::Closed)));
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn dropping_a_handle_releases_it() {
        let tracker = RequestTracker::new();
        {
            let _handle = tracker.enter().unwrap();
            assert_eq!(tracker.active_count(), 1);
        }
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn drained_returns_immediately_when_idle() {
        let tracker = RequestTracker::new();
        tracker.drained().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_churn_drains_to_exactly_zero() {
        let tracker = RequestTracker::new();
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let tracker = tracker.clone();
            tasks.push(tokio::spawn(async move {
                match tracker.enter() {
                    Ok(handle) => {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        tracker.leave(&handle).unwrap();
                        true
                    }
                    Err(_) => false,
                }
            }));
        }

        tokio::time::sleep(Duration::from_millis(2)).await;
        tracker.close();
        tracker.drained().await;
        assert_eq!(tracker.active_count(), 0);

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(tracker.active_count(), 0);
    }
}
