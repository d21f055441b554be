//! Shutdown coordination for the gateway.
//!
//! One broadcast signal stops the HTTP server and every background task
//! spawned through [`Shutdown::spawn_background`]. After the server has
//! drained its connections, [`Shutdown::drain`] waits for those tasks with a
//! bounded grace period.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    tasks: TaskTracker,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            tasks: TaskTracker::new(),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Spawn a task that owns its own shutdown receiver and is awaited by
    /// [`drain`](Self::drain).
    pub fn spawn_background<F, Fut>(&self, name: &'static str, task: F)
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fut = task(self.subscribe());
        self.tasks.spawn(async move {
            fut.await;
            tracing::debug!(task = name, "Background task stopped");
        });
    }

    /// Fire the shutdown signal. No further background tasks are expected.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
        self.tasks.close();
    }

    /// Wait up to `grace` for background tasks to finish. Returns `false`
    /// if some were still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(remaining = self.tasks.len(), "Background tasks still running after grace period");
                false
            }
        }
    }

    /// Background tasks not yet finished.
    pub fn background_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of receivers still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
