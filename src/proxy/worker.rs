//! Worker loop: fetch, probe off-thread, dispatch, back off

use crate::proxy::checker::{ProbeExecutor, WorkerConfig};
use crate::proxy::events::{EventSink, WorkerId};
use crate::proxy::models::{Endpoint, ErrorKind, ProbeResult};
use crate::proxy::source::SharedSource;
use std::ops::{Add, AddAssign};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, trace, warn};

/// Counters for the probes a worker ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub probed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl WorkerStats {
    fn record(&mut self, result: &ProbeResult) {
        self.probed += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl Add for WorkerStats {
    type Output = WorkerStats;

    fn add(self, other: WorkerStats) -> WorkerStats {
        WorkerStats {
            probed: self.probed + other.probed,
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
        }
    }
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: WorkerStats) {
        *self = *self + other;
    }
}

/// One probing loop sharing a source with the rest of its pool
///
/// The loop only suspends while the probe runs on the blocking pool, during
/// the backoff sleep after a failure, and while the sink handles an event.
pub struct Worker<E: ?Sized, S: ?Sized> {
    id: WorkerId,
    source: Arc<SharedSource>,
    config: Arc<WorkerConfig>,
    executor: Arc<E>,
    sink: Arc<S>,
}

impl<E, S> Worker<E, S>
where
    E: ProbeExecutor + ?Sized,
    S: EventSink + ?Sized,
{
    pub fn new(
        id: WorkerId,
        source: Arc<SharedSource>,
        config: Arc<WorkerConfig>,
        executor: Arc<E>,
        sink: Arc<S>,
    ) -> Self {
        Self {
            id,
            source,
            config,
            executor,
            sink,
        }
    }

    /// Run until the shared source is exhausted
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        trace!(worker = %self.id, "worker started");

        while let Some(endpoint) = self.source.next() {
            self.sink.on_begin(self.id, &endpoint).await;

            let result = self.execute(&endpoint).await;
            stats.record(&result);

            if result.is_success() {
                self.sink.on_success(self.id, &endpoint, &result).await;
                continue;
            }

            self.sink.on_failure(self.id, &endpoint, &result).await;

            if !self.config.error_delay.is_zero() {
                trace!(
                    worker = %self.id,
                    delay_ms = self.config.error_delay.as_millis() as u64,
                    "backing off after failure"
                );
                tokio::time::sleep(self.config.error_delay).await;
            }
        }

        debug!(
            worker = %self.id,
            probed = stats.probed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "source exhausted, worker done"
        );
        stats
    }

    /// Run the probe on the blocking pool and wait for its result
    async fn execute(&self, endpoint: &Endpoint) -> ProbeResult {
        let executor = Arc::clone(&self.executor);
        let config = Arc::clone(&self.config);
        let job = endpoint.clone();
        let begin_time = Instant::now();

        match tokio::task::spawn_blocking(move || executor.probe(&job, &config)).await {
            Ok(result) => result,
            Err(e) => {
                let message = join_error_message(e);
                warn!(worker = %self.id, endpoint = %endpoint, error = %message, "probe executor failed");
                ProbeResult::failure(begin_time, Instant::now(), ErrorKind::Internal, message)
            }
        }
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }

    let payload = e.into_panic();
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("probe panicked: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("probe panicked: {}", text)
    } else {
        "probe panicked".to_string()
    }
}
