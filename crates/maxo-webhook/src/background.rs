//! Fire-and-forget scheduling of webhook handler work.
//!
//! [`BackgroundTaskManager`] lets an engine acknowledge a webhook before its
//! handlers finish. Tasks leave the live set on their own when they complete,
//! fail, panic or get cancelled. [`BackgroundTaskManager::wait_all`] is the
//! only place tasks are ever cancelled.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// Default bound for draining tasks on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracks in-flight background tasks.
#[derive(Debug, Default)]
pub struct BackgroundTaskManager {
    tracker: TaskTracker,
    cancel: Mutex<CancellationToken>,
}

impl BackgroundTaskManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `work` independently of the caller.
    ///
    /// An `Err` result or a panic is logged, never propagated.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let cancel = self.cancel.lock().clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Webhook background task cancelled");
                }
                result = AssertUnwindSafe(work).catch_unwind() => match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(error = ?e, "Webhook background task failed"),
                    Err(panic) => error!(
                        panic = %panic_message(panic.as_ref()),
                        "Webhook background task failed"
                    ),
                },
            }
        });
    }

    /// Returns the number of unfinished tasks.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Returns whether no task is in flight.
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits for every in-flight task.
    ///
    /// With `Some(timeout)`, tasks still running after `timeout` are cancelled
    /// and awaited. The live set is empty when this returns.
    pub async fn wait_all(&self, timeout: Option<Duration>) {
        if self.tracker.is_empty() {
            return;
        }

        self.tracker.close();
        match timeout {
            None => self.tracker.wait().await,
            Some(timeout) => {
                if tokio::time::timeout(timeout, self.tracker.wait())
                    .await
                    .is_err()
                {
                    warn!(
                        count = self.tracker.len(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Cancelling webhook background tasks after drain timeout"
                    );
                    let cancel = std::mem::take(&mut *self.cancel.lock());
                    cancel.cancel();
                    self.tracker.wait().await;
                }
            }
        }
        self.tracker.reopen();
        debug!("Webhook background tasks drained");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_completed_tasks_leave_live_set() {
        let manager = BackgroundTaskManager::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            manager.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        manager.wait_all(None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_contained() {
        let manager = BackgroundTaskManager::new();
        manager.spawn(async { Err(anyhow::anyhow!("boom")) });
        manager.spawn(async { panic!("handler panicked") });

        manager.wait_all(Some(Duration::from_secs(5))).await;
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_wait_all_cancels_hung_tasks() {
        let manager = BackgroundTaskManager::new();
        manager.spawn(async {
            futures::future::pending::<()>().await;
            Ok(())
        });
        assert_eq!(manager.len(), 1);

        let started = Instant::now();
        manager.wait_all(Some(Duration::from_millis(50))).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_manager_is_reusable_after_cancellation() {
        let manager = BackgroundTaskManager::new();
        manager.spawn(async {
            futures::future::pending::<()>().await;
            Ok(())
        });
        manager.wait_all(Some(Duration::from_millis(10))).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        manager.spawn(async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        manager.wait_all(Some(Duration::from_secs(5))).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(manager.is_empty());
    }
}
