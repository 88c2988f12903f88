//! Proxy probe data models

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// One candidate proxy read from the source list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Position among the yielded endpoints, starting at 1
    pub sequence: u64,
    /// The trimmed source line this endpoint was parsed from
    pub raw_line: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(sequence: u64, raw_line: String, host: String, port: u16) -> Self {
        Self {
            sequence,
            raw_line,
            host,
            port,
        }
    }

    /// SOCKS5 proxy URL for this endpoint, with name resolution on the proxy side
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}:{}", self.sequence, self.host, self.port)
    }
}

/// Classification of a failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Proxy unreachable or refused the connection
    ConnectError,
    /// Deadline exceeded at any stage
    Timeout,
    /// Malformed or unexpected HTTP exchange, including error statuses
    ProtocolError,
    /// The expected marker was absent from the body
    ContentMismatch,
    /// The executor panicked
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectError => "connect_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolError => "protocol_error",
            ErrorKind::ContentMismatch => "content_mismatch",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
}

/// Outcome of a single probe, with timing
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    pub begin_time: Instant,
    pub end_time: Instant,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl ProbeResult {
    pub fn success(begin_time: Instant, end_time: Instant) -> Self {
        Self {
            outcome: ProbeOutcome::Success,
            begin_time,
            end_time: end_time.max(begin_time),
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failure(
        begin_time: Instant,
        end_time: Instant,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            outcome: ProbeOutcome::Failure,
            begin_time,
            end_time: end_time.max(begin_time),
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ProbeOutcome::Success
    }

    pub fn elapsed(&self) -> Duration {
        self.end_time.duration_since(self.begin_time)
    }

    pub fn elapsed_micros(&self) -> u64 {
        u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
