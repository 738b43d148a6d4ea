//! Supervised fire-and-forget tasks
//!
//! Work dispatched off the request path (the post-commit broadcast) runs
//! on a [`TaskSpawner`] owned by `main` and handed to the components that
//! need it. Task lifetime is tied to process shutdown, not to the
//! originating request: a cancelled ingest request does not cancel its
//! broadcast, and shutdown waits (briefly) for in-flight tasks.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct TaskSpawner {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
    shutting_down: AtomicBool,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a supervised fire-and-forget task.
    ///
    /// After shutdown has begun, new work is refused and dropped.
    pub fn spawn<F>(&self, label: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.shutting_down.load(Ordering::Acquire) {
            warn!(task = label, "spawner shutting down, task dropped");
            return;
        }
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            fut.await;
            if inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    /// Number of tasks currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Stop accepting work and wait up to `grace` for in-flight tasks.
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.shutting_down.store(true, Ordering::Release);

        let drained = tokio::time::timeout(grace, async {
            loop {
                let notified = self.inner.idle.notified();
                if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                    break;
                }
                notified.await;
            }
        })
        .await;

        match drained {
            Ok(()) => debug!("background tasks drained"),
            Err(_) => warn!(
                remaining = self.in_flight(),
                "shutdown grace period elapsed with tasks in flight"
            ),
        }
    }
}
