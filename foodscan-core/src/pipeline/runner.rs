//! Bounded executor for background pipeline operations.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

/// Runs pipeline operations on tokio tasks, at most `max_concurrent` at a time.
///
/// Every operation gets its own cancellation token, derived from a caller
/// supplied parent, which is in turn derived from the runner's root token.
/// `shutdown` cancels the root and with it everything still running.
#[derive(Clone)]
pub struct TaskRunner {
    permits: Arc<Semaphore>,
    root: CancellationToken,
}

impl TaskRunner {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            root: CancellationToken::new(),
        }
    }

    /// Token for a group of related operations (one scan).
    pub fn group_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Spawn `fut` under `parent`. The handle resolves to `None` if the
    /// operation was cancelled before finishing.
    pub fn spawn<F, T>(&self, stage: &'static str, parent: &CancellationToken, fut: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();
        let permits = Arc::clone(&self.permits);

        let join = tokio::spawn(
            async move {
                let _permit = tokio::select! {
                    _ = task_token.cancelled() => return None,
                    permit = permits.acquire_owned() => permit.ok()?,
                };

                // Output that is already ready wins over a cancellation
                // that arrived during the same poll.
                tokio::select! {
                    biased;
                    out = fut => Some(out),
                    _ = task_token.cancelled() => {
                        tracing::debug!("cancelled");
                        None
                    }
                }
            }
            .instrument(info_span!("pipeline_stage", stage)),
        );

        TaskHandle { join, token }
    }

    /// Cancel every operation spawned through this runner.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Permits not currently held by a running operation.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

/// A spawned operation that can be awaited or cancelled.
pub struct TaskHandle<T> {
    join: JoinHandle<Option<T>>,
    token: CancellationToken,
}

impl<T> TaskHandle<T> {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the result. `None` means cancelled (or the task panicked).
    pub async fn join(self) -> Option<T> {
        match self.join.await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, "pipeline task failed");
                None
            }
        }
    }
}
