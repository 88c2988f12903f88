//! Run configuration assembled from the command line

use crate::error::{Error, Result};
use crate::proxy::checker::{
    WorkerConfig, DEFAULT_CHECK_ANSWER, DEFAULT_CHECK_URL, DEFAULT_ERROR_DELAY_SECS,
    DEFAULT_REQ_LENGTH, DEFAULT_REQ_TIMEOUT_SECS,
};
use crate::proxy::pool::DEFAULT_CONCURRENCY;
use crate::report::OutputPaths;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a checking run needs
#[derive(Debug, Clone)]
pub struct Config {
    /// Proxy list to read; `None` checks nothing
    pub source: Option<PathBuf>,
    pub outputs: OutputPaths,
    /// Shell command run for every working proxy
    pub good_hook: Option<String>,
    pub check_url: String,
    pub check_answer: String,
    /// Request timeout in seconds
    pub req_timeout: f64,
    /// Maximum body bytes read per check
    pub req_length: u64,
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Delay after a failed check, in seconds
    pub error_delay: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            outputs: OutputPaths::default(),
            good_hook: None,
            check_url: DEFAULT_CHECK_URL.to_string(),
            check_answer: DEFAULT_CHECK_ANSWER.to_string(),
            req_timeout: DEFAULT_REQ_TIMEOUT_SECS,
            req_length: DEFAULT_REQ_LENGTH,
            concurrency: DEFAULT_CONCURRENCY,
            error_delay: DEFAULT_ERROR_DELAY_SECS,
        }
    }
}

impl Config {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if !self.req_timeout.is_finite() || self.req_timeout <= 0.0 {
            return Err(Error::config(format!(
                "request timeout must be a positive number of seconds, got {}",
                self.req_timeout
            )));
        }
        if !self.error_delay.is_finite() || self.error_delay < 0.0 {
            return Err(Error::config(format!(
                "error delay must be zero or a positive number of seconds, got {}",
                self.error_delay
            )));
        }
        Url::parse(&self.check_url)
            .map_err(|e| Error::config(format!("invalid check URL {:?}: {}", self.check_url, e)))?;
        Ok(())
    }

    /// Build the engine configuration shared by all workers
    pub fn worker_config(&self) -> Result<WorkerConfig> {
        self.validate()?;

        let request_timeout = Duration::try_from_secs_f64(self.req_timeout)
            .map_err(|e| Error::config(format!("request timeout: {}", e)))?;
        let error_delay = Duration::try_from_secs_f64(self.error_delay)
            .map_err(|e| Error::config(format!("error delay: {}", e)))?;

        Ok(WorkerConfig::new()
            .with_check_url(self.check_url.clone())
            .with_expected_marker(self.check_answer.clone())
            .with_request_timeout(request_timeout)
            .with_max_response_bytes(self.req_length)
            .with_error_delay(error_delay))
    }
}
