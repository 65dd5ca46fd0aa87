//! Lifecycle state machine.
//!
//! # States
//! - Created: configured, not yet started
//! - Starting: bind in progress
//! - Running: listener bound, accepting requests
//! - Stopping: listener closed, draining in-flight requests
//! - Stopped: terminal
//!
//! # State Transitions
//! ```text
//! Created → Starting: start() (exactly one caller wins)
//! Starting → Running: bind succeeded
//! Starting → Stopped: bind or plugin activation failed
//! Running → Stopping: stop() closes the listener
//! Stopping → Stopped: tracker drained, serve task joined
//! Created|Starting → Stopped: stop() before Running, no drain
//! ```
//!
//! Transitions are monotonic; no state is re-entered once left. A second
//! concurrent `start()` fails with `AlreadyStarting` rather than blocking.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::ShellError;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::lifecycle::tracker::RequestTracker;

/// State of an application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Drives the lifecycle of one shell instance.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<LifecycleState>,
    addr: Mutex<Option<SocketAddr>>,
    serve_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: ShutdownSignal,
    tracker: RequestTracker,
}

impl LifecycleController {
    pub fn new(tracker: RequestTracker) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LifecycleState::Created),
                addr: Mutex::new(None),
                serve_task: Mutex::new(None),
                shutdown: ShutdownSignal::new(),
                tracker,
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock().unwrap()
    }

    /// Claim the `Created → Starting` transition.
    pub fn begin_start(&self) -> Result<(), ShellError> {
        let mut state = self.inner.state.lock().unwrap();
        match *state {
            LifecycleState::Created => {
                *state = LifecycleState::Starting;
                Ok(())
            }
            LifecycleState::Starting | LifecycleState::Running => Err(ShellError::AlreadyStarting),
            LifecycleState::Stopping | LifecycleState::Stopped => Err(ShellError::AlreadyStopped),
        }
    }

    /// Record a failed start attempt. Terminal.
    pub fn abort_start(&self) {
        *self.inner.state.lock().unwrap() = LifecycleState::Stopped;
        self.inner.shutdown.mark_done();
    }

    /// Record a successful bind and the serve task driving the listener.
    pub fn mark_running(&self, addr: SocketAddr, serve: JoinHandle<()>) -> Result<(), ShellError> {
        let mut state = self.inner.state.lock().unwrap();
        if *state != LifecycleState::Starting {
            // stop() was called while the bind was in progress
            return Err(ShellError::AlreadyStopped);
        }
        *self.inner.addr.lock().unwrap() = Some(addr);
        *self.inner.serve_task.lock().unwrap() = Some(serve);
        *state = LifecycleState::Running;
        Ok(())
    }

    /// Resolved listening address, available only while `Running`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        if self.state() != LifecycleState::Running {
            return None;
        }
        *self.inner.addr.lock().unwrap()
    }

    /// Resolved listening port, available only while `Running`.
    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    /// Receiver for the listener-close signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.shutdown.subscribe()
    }

    pub(crate) fn request_close(&self) {
        self.inner.shutdown.trigger_close();
    }

    /// Stop the shell and wait until it reaches `Stopped`.
    ///
    /// From `Running` this closes the listener, refuses new requests and
    /// waits for every in-flight request to finish. There is no drain
    /// deadline; a request that never completes blocks shutdown until the
    /// caller imposes its own timeout and releases resources itself. Before
    /// `Running` the shell goes straight to `Stopped` without draining.
    /// Safe to call from any number of tasks; every caller returns once the
    /// shell is `Stopped`.
    pub async fn stop(&self) {
        let drive = {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                LifecycleState::Created | LifecycleState::Starting => {
                    *state = LifecycleState::Stopped;
                    info!("stopped before running, nothing to drain");
                    self.inner.shutdown.mark_done();
                    return;
                }
                LifecycleState::Running => {
                    *state = LifecycleState::Stopping;
                    true
                }
                LifecycleState::Stopping => false,
                LifecycleState::Stopped => return,
            }
        };

        if drive {
            self.spawn_drain();
        }
        self.inner.shutdown.wait_done().await;
    }

    /// Run the drain on its own task so that a cancelled `stop()` caller
    /// cannot stall the `Stopping → Stopped` transition.
    fn spawn_drain(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.shutdown.trigger_close();
            inner.tracker.close();

            let active = inner.tracker.active_count();
            if active > 0 {
                info!(active, "listener closed, draining in-flight requests");
            }
            loop {
                tokio::select! {
                    () = inner.tracker.drained() => break,
                    () = tokio::time::sleep(Duration::from_secs(5)) => {
                        warn!(
                            active = inner.tracker.active_count(),
                            oldest_ms = inner
                                .tracker
                                .oldest_in_flight()
                                .map_or(0, |age| age.as_millis() as u64),
                            "still draining"
                        );
                    }
                }
            }

            let serve = inner.serve_task.lock().unwrap().take();
            if let Some(serve) = serve {
                let _ = serve.await;
            }

            *inner.state.lock().unwrap() = LifecycleState::Stopped;
            inner.shutdown.mark_done();
            info!("shutdown complete");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> LifecycleController {
        LifecycleController::new(RequestTracker::new())
    }

    #[test]
    fn start_is_only_legal_from_created() {
        let lifecycle = controller();
        assert_eq!(lifecycle.state(), LifecycleState::Created);

        lifecycle.begin_start().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Starting);

        assert!(matches!(
            lifecycle.begin_start(),
            Err(ShellError::AlreadyStarting)
        ));
    }

    #[test]
    fn a_failed_start_is_terminal() {
        let lifecycle = controller();
        lifecycle.begin_start().unwrap();
        lifecycle.abort_start();

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(matches!(
            lifecycle.begin_start(),
            Err(ShellError::AlreadyStopped)
        ));
    }

    #[tokio::test]
    async fn stop_before_start_goes_straight_to_stopped() {
        let lifecycle = controller();
        lifecycle.stop().await;

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(matches!(
            lifecycle.begin_start(),
            Err(ShellError::AlreadyStopped)
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let lifecycle = controller();
        lifecycle.stop().await;
        lifecycle.stop().await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_from_running_drains_and_joins_the_serve_task() {
        let lifecycle = controller();
        lifecycle.begin_start().unwrap();

        let mut close = lifecycle.subscribe();
        let serve = tokio::spawn(async move {
            let _ = close.recv().await;
        });
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        lifecycle.mark_running(addr, serve).unwrap();
        assert_eq!(lifecycle.port(), Some(8080));

        lifecycle.stop().await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(lifecycle.port(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_stop_callers_all_return_at_stopped() {
        let lifecycle = controller();
        lifecycle.begin_start().unwrap();

        let mut close = lifecycle.subscribe();
        let serve = tokio::spawn(async move {
            let _ = close.recv().await;
        });
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        lifecycle.mark_running(addr, serve).unwrap();

        let first = lifecycle.clone();
        let second = lifecycle.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.stop().await }),
            tokio::spawn(async move { second.stop().await }),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }
}
