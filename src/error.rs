//! Error types for startup and reporting failures
//!
//! Per-probe failures are not errors in this sense: they are folded into a
//! [`ProbeResult`](crate::proxy::ProbeResult) by the executor and never
//! travel through `Result`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Checker error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read proxy source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot open output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn unreadable_source<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::Source {
            path: path.into(),
            source,
        }
    }

    pub fn output_file<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::Output {
            path: path.into(),
            source,
        }
    }
}

/// Result type for the checker library
pub type Result<T> = std::result::Result<T, Error>;
