//! Fixed-size pool of workers sharing one source

use crate::proxy::checker::{ProbeExecutor, WorkerConfig};
use crate::proxy::events::{EventSink, WorkerId};
use crate::proxy::source::SharedSource;
use crate::proxy::worker::{Worker, WorkerStats};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Totals for a completed pool run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub workers: usize,
    pub probed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl PoolSummary {
    fn from_stats(workers: usize, stats: &[WorkerStats], elapsed: Duration) -> Self {
        let total = stats.iter().copied().fold(WorkerStats::default(), |acc, s| acc + s);
        Self {
            workers,
            probed: total.probed,
            succeeded: total.succeeded,
            failed: total.failed,
            elapsed,
        }
    }
}

/// Runs a fixed number of workers against one source until it is drained
///
/// All workers are futures on the task that awaits [`WorkerPool::run`], so a
/// single-threaded runtime is enough to drive the pool; the probes themselves
/// run on tokio's blocking pool, which should allow at least as many threads
/// as there are workers.
pub struct WorkerPool<E: ?Sized, S: ?Sized> {
    config: Arc<WorkerConfig>,
    executor: Arc<E>,
    sink: Arc<S>,
    worker_count: usize,
}

impl<E, S> WorkerPool<E, S>
where
    E: ProbeExecutor + ?Sized,
    S: EventSink + ?Sized,
{
    pub fn new(config: WorkerConfig, executor: Arc<E>, sink: Arc<S>) -> Self {
        Self {
            config: Arc::new(config),
            executor,
            sink,
            worker_count: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the number of workers; zero is treated as one
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Probe every endpoint of `source` and return once all workers are done
    pub async fn run(&self, source: SharedSource) -> PoolSummary {
        let source = Arc::new(source);
        let started = Instant::now();

        debug!(workers = self.worker_count, "starting worker pool");

        let workers = (1..=self.worker_count).map(|i| {
            Worker::new(
                WorkerId(i),
                Arc::clone(&source),
                Arc::clone(&self.config),
                Arc::clone(&self.executor),
                Arc::clone(&self.sink),
            )
            .run()
        });
        let stats = join_all(workers).await;

        let summary = PoolSummary::from_stats(self.worker_count, &stats, started.elapsed());
        debug!(
            probed = summary.probed,
            pulled = source.pulled(),
            "worker pool finished"
        );
        summary
    }
}
