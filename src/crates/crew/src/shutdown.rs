//! Cooperative cancellation
//!
//! One coordinator per project generation. The worker checks the flag at the
//! top of every iteration and races its waits against
//! [`ShutdownCoordinator::wait_for_shutdown`]; a task already executing is
//! allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Stop flag shared by the orchestrator, its worker and signal handlers
#[derive(Clone)]
pub struct ShutdownCoordinator {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("requested", &self.is_shutdown_requested())
            .finish()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn request_shutdown(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("Worker shutdown requested");
            self.notify.notify_waiters();
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested, including before the call.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before reading the flag so a concurrent request is not lost.
        notified.as_mut().enable();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }

    /// Spawn a task that turns SIGINT/SIGTERM (Ctrl+C elsewhere) into a
    /// shutdown request.
    pub fn install_signal_handlers(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let (mut sigint, mut sigterm) =
                    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                        (Err(e), _) | (_, Err(e)) => {
                            error!(error = %e, "Failed to install signal handlers");
                            return;
                        }
                    };

                tokio::select! {
                    _ = sigint.recv() => {
                        warn!("Received SIGINT, stopping after the current task...");
                    }
                    _ = sigterm.recv() => {
                        warn!("Received SIGTERM, stopping after the current task...");
                    }
                    _ = coordinator.wait_for_shutdown() => return,
                }
                coordinator.request_shutdown();
            }

            #[cfg(not(unix))]
            {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "Failed to listen for Ctrl+C");
                            return;
                        }
                        warn!("Received Ctrl+C, stopping after the current task...");
                        coordinator.request_shutdown();
                    }
                    _ = coordinator.wait_for_shutdown() => {}
                }
            }
        })
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
    use std::time::Duration;

    #[test]
    fn test_second_request_is_a_no_op() {
        let stop = ShutdownCoordinator::new();
        assert!(!stop.is_shutdown_requested());

        stop.request_shutdown();
        stop.request_shutdown();
        assert!(stop.is_shutdown_requested());
        assert!(format!("{:?}", stop).contains("requested: true"));
    }

    #[tokio::test]
    async fn test_waiting_worker_wakes_on_request() {
        let stop = ShutdownCoordinator::new();
        let worker_side = stop.clone();

        let waiter = tokio::spawn(async move {
            worker_side.wait_for_shutdown().await;
            worker_side.is_shutdown_requested()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.request_shutdown();

        let woke = tokio::time::timeout(Duration::from_millis(100), waiter).await;
        assert!(woke.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_late_waiter_does_not_block() {
        let stop = ShutdownCoordinator::default();
        stop.request_shutdown();

        let waited =
            tokio::time::timeout(Duration::from_millis(50), stop.wait_for_shutdown()).await;
        assert!(waited.is_ok());
    }
}
