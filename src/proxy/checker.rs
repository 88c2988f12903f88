//! Proxy checker performing a single probe through a SOCKS proxy

use crate::proxy::models::{Endpoint, ErrorKind, ProbeResult};
use reqwest::blocking::Client;
use reqwest::Proxy as ReqwestProxy;
use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Default URL fetched through each proxy
pub const DEFAULT_CHECK_URL: &str = "https://www.google.co.uk/";

/// Default text expected in the fetched body
pub const DEFAULT_CHECK_ANSWER: &str = "Google";

/// Default deadline for connect, request and body read, in seconds
pub const DEFAULT_REQ_TIMEOUT_SECS: f64 = 20.0;

/// Default number of body bytes inspected
pub const DEFAULT_REQ_LENGTH: u64 = 10_000_000;

/// Default pause after a failed probe, in seconds
pub const DEFAULT_ERROR_DELAY_SECS: f64 = 0.1;

/// Per-pool probe settings, shared read-only by all workers
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// URL to fetch through each proxy
    pub check_url: String,
    /// Case-sensitive substring the body must contain
    pub expected_marker: String,
    /// Overall deadline for connect, request and body read
    pub request_timeout: Duration,
    /// Maximum number of body bytes read
    pub max_response_bytes: u64,
    /// Pause applied to a worker after each failed probe
    pub error_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            expected_marker: DEFAULT_CHECK_ANSWER.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQ_TIMEOUT_SECS),
            max_response_bytes: DEFAULT_REQ_LENGTH,
            error_delay: Duration::from_secs_f64(DEFAULT_ERROR_DELAY_SECS),
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_url(mut self, url: String) -> Self {
        self.check_url = url;
        self
    }

    pub fn with_expected_marker(mut self, marker: String) -> Self {
        self.expected_marker = marker;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, max: u64) -> Self {
        self.max_response_bytes = max;
        self
    }

    pub fn with_error_delay(mut self, delay: Duration) -> Self {
        self.error_delay = delay;
        self
    }
}

/// Performs one blocking proxy check
///
/// Implementations must always return a [`ProbeResult`]; every failure is
/// reported as [`ProbeOutcome::Failure`](crate::proxy::ProbeOutcome::Failure).
/// The call may block for up to `config.request_timeout`, so callers run it
/// on a blocking thread.
pub trait ProbeExecutor: Send + Sync + 'static {
    fn probe(&self, endpoint: &Endpoint, config: &WorkerConfig) -> ProbeResult;
}

impl<F> ProbeExecutor for F
where
    F: Fn(&Endpoint, &WorkerConfig) -> ProbeResult + Send + Sync + 'static,
{
    fn probe(&self, endpoint: &Endpoint, config: &WorkerConfig) -> ProbeResult {
        self(endpoint, config)
    }
}

/// Classified failure of one probe stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeouts take precedence: a connect that timed out is a timeout
    fn from_reqwest_ref(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ErrorKind::Timeout
        } else if e.is_connect() {
            ErrorKind::ConnectError
        } else {
            ErrorKind::ProtocolError
        };
        ProbeError::new(kind, error_chain(e))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::from_reqwest_ref(&e)
    }
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        // The blocking body reader wraps transport errors in io::Error
        if let Some(inner) = e.get_ref().and_then(|inner| inner.downcast_ref::<reqwest::Error>()) {
            let mut classified = ProbeError::from_reqwest_ref(inner);
            classified.message = error_chain(&e);
            return classified;
        }

        let kind = match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => ErrorKind::ConnectError,
            _ => ErrorKind::ProtocolError,
        };
        ProbeError::new(kind, error_chain(&e))
    }
}

/// Render an error with all of its sources, outermost first
fn error_chain(e: &(dyn StdError + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

/// Check a decoded body for the expected marker
pub fn check_answer(body: &str, marker: &str) -> Result<(), ProbeError> {
    if body.contains(marker) {
        Ok(())
    } else {
        Err(ProbeError::new(
            ErrorKind::ContentMismatch,
            format!("expected marker {:?} not found in response body", marker),
        ))
    }
}

/// Read at most `limit` body bytes, giving up once `deadline` has passed
///
/// The blocking client times out each read separately, not the whole body.
pub fn read_body<R: Read>(reader: R, limit: u64, deadline: Instant) -> Result<Vec<u8>, ProbeError> {
    let mut reader = reader.take(limit);
    let mut body = Vec::new();
    let mut chunk = [0u8; 8 * 1024];

    loop {
        if Instant::now() >= deadline {
            return Err(ProbeError::new(
                ErrorKind::Timeout,
                format!("response body not complete before deadline ({} bytes read)", body.len()),
            ));
        }
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(body),
            Ok(n) => body.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Probe executor fetching the check URL through the endpoint as a SOCKS5 proxy
#[derive(Debug, Clone, Default)]
pub struct SocksProbe;

impl SocksProbe {
    pub fn new() -> Self {
        Self
    }

    /// Create a blocking client routed through the endpoint
    fn create_client(&self, endpoint: &Endpoint, config: &WorkerConfig) -> Result<Client, ProbeError> {
        let proxy = ReqwestProxy::all(endpoint.socks_url())
            .map_err(|e| ProbeError::new(ErrorKind::ConnectError, error_chain(&e)))?;

        let client = Client::builder()
            .proxy(proxy)
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ProbeError::new(ErrorKind::Internal, error_chain(&e)))?;

        Ok(client)
    }

    fn fetch(&self, endpoint: &Endpoint, config: &WorkerConfig, deadline: Instant) -> Result<(), ProbeError> {
        let client = self.create_client(endpoint, config)?;
        let response = client.get(&config.check_url).send()?.error_for_status()?;

        let body = read_body(response, config.max_response_bytes, deadline)?;

        check_answer(&String::from_utf8_lossy(&body), &config.expected_marker)
    }
}

impl ProbeExecutor for SocksProbe {
    fn probe(&self, endpoint: &Endpoint, config: &WorkerConfig) -> ProbeResult {
        let begin_time = Instant::now();
        let outcome = self.fetch(endpoint, config, begin_time + config.request_timeout);
        let end_time = Instant::now();

        match outcome {
            Ok(()) => ProbeResult::success(begin_time, end_time),
            Err(e) => ProbeResult::failure(begin_time, end_time, e.kind, e.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.check_url, DEFAULT_CHECK_URL);
        assert_eq!(config.expected_marker, DEFAULT_CHECK_ANSWER);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.max_response_bytes, 10_000_000);
        assert_eq!(config.error_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::new()
            .with_check_url("http://example.com".to_string())
            .with_expected_marker("Example".to_string())
            .with_request_timeout(Duration::from_secs(5))
            .with_max_response_bytes(1024)
            .with_error_delay(Duration::ZERO);

        assert_eq!(config.check_url, "http://example.com");
        assert_eq!(config.expected_marker, "Example");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_bytes, 1024);
        assert_eq!(config.error_delay, Duration::ZERO);
    }

    #[test]
    fn test_check_answer_is_case_sensitive_substring() {
        assert!(check_answer("<title>Google</title>", "Google").is_ok());

        let err = check_answer("<title>google</title>", "Google").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ContentMismatch);

        let err = check_answer("", "Google").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ContentMismatch);
    }

    /// Hands out one byte per read, sleeping before each
    struct Trickle {
        remaining: usize,
        pause: Duration,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 || buf.is_empty() {
                return Ok(0);
            }
            std::thread::sleep(self.pause);
            self.remaining -= 1;
            buf[0] = b'G';
            Ok(1)
        }
    }

    #[test]
    fn test_read_body_respects_limit() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let body = read_body(&b"Google search"[..], 6, deadline).unwrap();
        assert_eq!(body, b"Google");
    }

    #[test]
    fn test_read_body_stops_at_deadline() {
        let started = Instant::now();
        let reader = Trickle {
            remaining: 1_000,
            pause: Duration::from_millis(20),
        };

        let err = read_body(reader, 10_000, started + Duration::from_millis(200)).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_io_error_classification() {
        let timeout = ProbeError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(timeout.kind, ErrorKind::Timeout);

        let refused = ProbeError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "nope"));
        assert_eq!(refused.kind, ErrorKind::ConnectError);

        let garbage = ProbeError::from(io::Error::new(io::ErrorKind::InvalidData, "bad chunk"));
        assert_eq!(garbage.kind, ErrorKind::ProtocolError);
        assert_eq!(garbage.message, "bad chunk");
    }

    #[test]
    fn test_closure_executor() {
        let executor = |_: &Endpoint, _: &WorkerConfig| {
            let now = Instant::now();
            ProbeResult::failure(now, now, ErrorKind::ConnectError, "refused")
        };
        let endpoint = Endpoint::new(1, "h:1".to_string(), "h".to_string(), 1);

        let result = executor.probe(&endpoint, &WorkerConfig::default());
        assert_eq!(result.error_kind, Some(ErrorKind::ConnectError));
    }

    #[test]
    fn test_unreachable_proxy_fails_without_panicking() {
        // Port 1 on localhost is closed on any sane test host
        let endpoint = Endpoint::new(1, "127.0.0.1:1".to_string(), "127.0.0.1".to_string(), 1);
        let config = WorkerConfig::new()
            .with_check_url("http://127.0.0.1:9/".to_string())
            .with_request_timeout(Duration::from_secs(2));

        let result = SocksProbe::new().probe(&endpoint, &config);

        assert!(!result.is_success());
        assert!(result.error_message.is_some());
        assert!(result.end_time >= result.begin_time);
    }
}
