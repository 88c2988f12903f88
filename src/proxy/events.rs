//! Lifecycle events emitted by workers

use crate::proxy::models::{Endpoint, ProbeResult};
use async_trait::async_trait;
use std::fmt;

/// 1-based index of a worker within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiver of probe lifecycle events
///
/// Callbacks for one worker are strictly ordered: `on_begin`, then exactly
/// one of `on_success` or `on_failure`. Callbacks from different workers may
/// run concurrently, so implementations guard their own shared state.
///
/// Callbacks are awaited by the worker before it moves on. A sink that fails
/// internally (for example while writing a report file) logs and carries on;
/// there is no error channel back into the pool.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called before the probe of `endpoint` starts.
    async fn on_begin(&self, worker: WorkerId, endpoint: &Endpoint);

    /// Called after a successful probe.
    async fn on_success(&self, worker: WorkerId, endpoint: &Endpoint, result: &ProbeResult);

    /// Called after a failed probe, before any backoff delay.
    async fn on_failure(&self, worker: WorkerId, endpoint: &Endpoint, result: &ProbeResult);
}

/// Sink that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn on_begin(&self, _worker: WorkerId, _endpoint: &Endpoint) {}

    async fn on_success(&self, _worker: WorkerId, _endpoint: &Endpoint, _result: &ProbeResult) {}

    async fn on_failure(&self, _worker: WorkerId, _endpoint: &Endpoint, _result: &ProbeResult) {}
}
