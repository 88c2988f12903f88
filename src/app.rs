//! A complete checking run: open inputs and outputs, drive the pool, flush

use crate::config::Config;
use crate::error::Result;
use crate::proxy::{EndpointParser, PoolSummary, ProbeExecutor, SharedSource, SocksProbe, WorkerPool};
use crate::report::{GoodHook, Reporter};
use std::sync::Arc;
use tracing::{info, warn};

/// Check every proxy of the configured source through SOCKS
pub async fn run(config: &Config) -> Result<PoolSummary> {
    run_with_executor(config, Arc::new(SocksProbe::new())).await
}

/// Run with a custom probe executor
///
/// All startup failures (bad configuration, unreadable source, output files
/// that cannot be created) are returned before any probe starts.
pub async fn run_with_executor<E>(config: &Config, executor: Arc<E>) -> Result<PoolSummary>
where
    E: ProbeExecutor + ?Sized,
{
    let worker_config = config.worker_config()?;

    let source = match &config.source {
        Some(path) => {
            info!(path = %path.display(), "reading proxy source");
            SharedSource::new(EndpointParser::open(path)?)
        }
        None => {
            warn!("no proxy source given, nothing to check");
            SharedSource::empty()
        }
    };

    let reporter = Arc::new(
        Reporter::open(&config.outputs)?.with_hook(config.good_hook.as_deref().map(GoodHook::new)),
    );

    info!(
        workers = config.concurrency,
        check_url = %worker_config.check_url,
        timeout_s = config.req_timeout,
        error_delay_s = config.error_delay,
        "checking proxies"
    );

    let pool = WorkerPool::new(worker_config, executor, Arc::clone(&reporter))
        .with_workers(config.concurrency);
    let summary = pool.run(source).await;

    reporter.finish()?;

    info!(
        probed = summary.probed,
        good = summary.succeeded,
        bad = summary.failed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "done!"
    );

    Ok(summary)
}
