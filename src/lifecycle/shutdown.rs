//! Shutdown signaling for the shell.

use tokio::sync::{broadcast, watch};

/// Two-stage shutdown signal.
///
/// The close broadcast tells long-running tasks to stop accepting work; the
/// completion flag is observed by every caller waiting for shutdown to
/// finish.
#[derive(Debug)]
pub struct ShutdownSignal {
    close_tx: broadcast::Sender<()>,
    done_tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (close_tx, _) = broadcast::channel(1);
        let (done_tx, _) = watch::channel(false);
        Self { close_tx, done_tx }
    }

    /// Subscribe to the close signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.close_tx.subscribe()
    }

    /// Fire the close signal.
    pub fn trigger_close(&self) {
        let _ = self.close_tx.send(());
    }

    /// Mark shutdown as finished. The flag persists for late subscribers.
    pub fn mark_done(&self) {
        self.done_tx.send_replace(true);
    }

    /// Wait until shutdown has finished; returns immediately if it already
    /// has.
    pub async fn wait_done(&self) {
        let mut done_rx = self.done_tx.subscribe();
        while !*done_rx.borrow_and_update() {
            if done_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn close_signal_reaches_subscribers() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();

        signal.trigger_close();
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn wait_done_returns_immediately_after_mark_done() {
        let signal = ShutdownSignal::new();
        signal.mark_done();
        signal.wait_done().await;
    }

    #[tokio::test]
    async fn wait_done_observes_a_later_mark() {
        let signal = Arc::new(ShutdownSignal::new());

        let marker = Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            marker.mark_done();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.wait_done())
            .await
            .expect("wait_done never observed the mark");
    }
}
