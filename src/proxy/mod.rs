//! Proxy module for parsing and checking SOCKS proxies
//!
//! This module provides functionality for:
//! - Reading HOST:PORT proxy lists into sequenced endpoints
//! - Probing one endpoint by fetching a sample page through it
//! - Running a fixed pool of workers over a shared endpoint source
//! - Reporting begin/success/failure events to an [`EventSink`]

pub mod checker;
pub mod events;
pub mod models;
pub mod parser;
pub mod pool;
pub mod source;
pub mod worker;

pub use checker::{ProbeError, ProbeExecutor, SocksProbe, WorkerConfig};
pub use events::{EventSink, NoopSink, WorkerId};
pub use models::{Endpoint, ErrorKind, ProbeOutcome, ProbeResult};
pub use parser::{EndpointParser, EndpointReader};
pub use pool::{PoolSummary, WorkerPool};
pub use source::SharedSource;
pub use worker::{Worker, WorkerStats};
