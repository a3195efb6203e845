use std::future::Future;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

/// Bounded worker pool: at most `concurrency_limit` submitted tasks run at once.
///
/// Results come back through the returned [`JoinSet`] in completion order.
/// A failing or panicking task never blocks delivery of the others.
pub struct HarvesterExecutor {
    semaphore: Arc<Semaphore>,
    concurrency_limit: usize,
}

impl HarvesterExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            concurrency_limit,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Spawns one task per item. Each task waits for a permit before running `work`.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self, items, work), fields(concurrency = self.concurrency_limit))]
    pub fn spawn_all<I, F, Fut, R, E>(&self, items: I, work: F) -> JoinSet<Result<R, E>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: From<AcquireError> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for item in items {
            let semaphore = Arc::clone(&self.semaphore);
            let job = work(item);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                job.await
            });
        }
        debug!(submitted = tasks.len(), "Tasks submitted");
        tasks
    }
}
