use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Notify};

/// `ADMIN shutdown` scheduling and the stop signal the accept loop and every
/// connection runner watch (§4.5 "Shutdown", §4.6 admin sub-operations).
#[derive(Clone)]
pub struct ShutdownCoordinator {
    announced: broadcast::Sender<DateTime<Utc>>,
    stopped: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            announced: broadcast::channel(16).0,
            stopped: Arc::new(AtomicBool::new(false)),
            stop_notify: Arc::new(Notify::new()),
        }
    }

    /// Announces `at` to every current subscriber (each connection's writer
    /// task relays it as SHTDWN) and spawns the timer that flips the stop
    /// signal once `at` arrives.
    pub fn schedule(&self, at: DateTime<Utc>) {
        let _ = self.announced.send(at);
        let this = self.clone();
        tokio::spawn(async move {
            let now = Utc::now();
            if let Ok(delta) = (at - now).to_std() {
                tokio::time::sleep(delta).await;
            }
            this.stopped.store(true, Ordering::SeqCst);
            this.stop_notify.notify_waiters();
        });
    }

    pub fn subscribe_announcements(&self) -> broadcast::Receiver<DateTime<Utc>> {
        self.announced.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has fired; used by the accept loop to stop
    /// taking new connections.
    pub async fn wait_stopped(&self) {
        if self.is_stopped() {
            return;
        }
        self.stop_notify.notified().await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_after_the_scheduled_instant() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.schedule(Utc::now() + chrono::Duration::milliseconds(20));
        assert!(!coordinator.is_stopped());
        coordinator.wait_stopped().await;
        assert!(coordinator.is_stopped());
    }
}
