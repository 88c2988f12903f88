//! Socks Check - SOCKS Proxy Checker
//!
//! Checks a list of SOCKS proxies by fetching a sample page through each one
//! and looking for an expected marker in the response. A fixed pool of
//! workers shares one ordered source; each probe runs on a blocking thread so
//! a hanging proxy never stalls the other workers.

pub mod app;
pub mod config;
pub mod error;
pub mod proxy;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};
pub use proxy::*;
