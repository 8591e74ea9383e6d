//! Bounded parallel task groups with shared cancellation.
//!
//! [`TaskGroup`] is the concurrency primitive the
//! [`Processor`](crate::processor::Processor) runs on: spawn any number of
//! fallible tasks, at most `limit` run concurrently, all of them share one
//! cancellation token, and the first failure cancels the rest. Joining the
//! group surfaces that first error; later errors are discarded.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Fallback concurrency limit when a caller configures a non-positive one.
pub const DEFAULT_LIMIT: usize = 10;

/// A group of cooperating tasks with bounded concurrency.
///
/// Tasks wait for one of `limit` permits before their body runs, racing the
/// shared token while they wait: after cancellation, no new task body starts.
/// A task that panics is surfaced through the group's error type via
/// `From<JoinError>`.
///
/// # Examples
///
/// ```rust
/// use attrflow::tasks::TaskGroup;
/// use tokio::task::JoinError;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct WorkerError;
///
/// impl From<JoinError> for WorkerError {
///     fn from(_: JoinError) -> Self {
///         WorkerError
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut group: TaskGroup<WorkerError> = TaskGroup::new(2, CancellationToken::new());
/// for _ in 0..8 {
///     group.spawn(async { Ok(()) });
/// }
/// assert!(group.join().await.is_ok());
/// # }
/// ```
pub struct TaskGroup<E> {
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
    tasks: JoinSet<Result<(), E>>,
}

impl<E> TaskGroup<E>
where
    E: From<JoinError> + Send + 'static,
{
    /// Creates a group allowing up to `limit` concurrent task bodies, all
    /// observing `cancel`. A non-positive limit falls back to
    /// [`DEFAULT_LIMIT`].
    #[must_use]
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        Self {
            cancel,
            permits: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
        }
    }

    /// The cancellation token shared by every task of this group.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns a task onto the group.
    ///
    /// The task first acquires a permit, racing the group token; if the group
    /// is cancelled before a permit arrives, the body never runs and the task
    /// resolves clean.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let permits = self.permits.clone();
        self.tasks.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Ok(()),
                },
            };
            task.await
        });
    }

    /// Awaits every task and returns the first error observed.
    ///
    /// The first `Err` (or panic) cancels the shared token so siblings stop
    /// at their next suspension point; their results are discarded.
    pub async fn join(mut self) -> Result<(), E> {
        let mut first: Option<E> = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => Err(E::from(join_error)),
            };
            if let Err(error) = outcome {
                if first.is_none() {
                    self.cancel.cancel();
                    first = Some(error);
                }
            }
        }
        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
