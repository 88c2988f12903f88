//! Event sink writing check results to the console, list files, CSV files and the good hook

use crate::error::{Error, Result};
use crate::proxy::{Endpoint, ErrorKind, EventSink, ProbeResult, WorkerId};
use crate::report::hook::GoodHook;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Output files requested on the command line
#[derive(Debug, Clone, Default)]
pub struct OutputPaths {
    /// Raw lines of working proxies
    pub good: Option<PathBuf>,
    /// `host,port,elapsed_us` rows for working proxies
    pub good_csv: Option<PathBuf>,
    /// Raw lines of failed proxies
    pub bad: Option<PathBuf>,
    /// `host,port,elapsed_us,error_kind,error_message` rows for failed proxies
    pub bad_csv: Option<PathBuf>,
}

#[derive(Serialize)]
struct GoodRow<'a> {
    host: &'a str,
    port: u16,
    elapsed_micros: u64,
}

#[derive(Serialize)]
struct BadRow<'a> {
    host: &'a str,
    port: u16,
    elapsed_micros: u64,
    error_kind: Option<ErrorKind>,
    error_message: Option<&'a str>,
}

type CsvSink = Mutex<csv::Writer<File>>;

/// Reporting sink used by the command line tool
#[derive(Default)]
pub struct Reporter {
    good: Option<Mutex<LineWriter<File>>>,
    good_csv: Option<CsvSink>,
    bad: Option<Mutex<LineWriter<File>>>,
    bad_csv: Option<CsvSink>,
    hook: Option<GoodHook>,
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::output_file(path, e))
}

fn open_list(path: Option<&PathBuf>) -> Result<Option<Mutex<LineWriter<File>>>> {
    path.map(|p| create(p).map(|f| Mutex::new(LineWriter::new(f))))
        .transpose()
}

fn open_csv(path: Option<&PathBuf>) -> Result<Option<CsvSink>> {
    path.map(|p| {
        create(p).map(|f| {
            Mutex::new(
                csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(f),
            )
        })
    })
    .transpose()
}

impl Reporter {
    /// A reporter that only logs
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (truncating) every requested output file
    pub fn open(outputs: &OutputPaths) -> Result<Self> {
        Ok(Self {
            good: open_list(outputs.good.as_ref())?,
            good_csv: open_csv(outputs.good_csv.as_ref())?,
            bad: open_list(outputs.bad.as_ref())?,
            bad_csv: open_csv(outputs.bad_csv.as_ref())?,
            hook: None,
        })
    }

    pub fn with_hook(mut self, hook: Option<GoodHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Flush every open output file
    pub fn finish(&self) -> Result<()> {
        for list in [&self.good, &self.bad].into_iter().flatten() {
            list.lock().flush()?;
        }
        for table in [&self.good_csv, &self.bad_csv].into_iter().flatten() {
            table.lock().flush()?;
        }
        Ok(())
    }

    fn append_line(list: &Option<Mutex<LineWriter<File>>>, line: &str) {
        if let Some(list) = list {
            if let Err(e) = writeln!(list.lock(), "{}", line) {
                error!(error = %e, "failed to append to result list");
            }
        }
    }

    fn append_row<T: Serialize>(table: &Option<CsvSink>, row: T) {
        if let Some(table) = table {
            let mut writer = table.lock();
            let written = writer
                .serialize(row)
                .map_err(Error::from)
                .and_then(|_| writer.flush().map_err(Error::from));
            if let Err(e) = written {
                error!(error = %e, "failed to write CSV row");
            }
        }
    }

    async fn run_hook(&self, endpoint: &Endpoint, elapsed_micros: u64) {
        let Some(hook) = &self.hook else {
            return;
        };

        match hook.run(&endpoint.host, endpoint.port, elapsed_micros).await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(
                hook = hook.command(),
                host = %endpoint.host,
                port = endpoint.port,
                %status,
                "good hook exited unsuccessfully"
            ),
            Err(e) => warn!(hook = hook.command(), error = %e, "failed to run good hook"),
        }
    }
}

#[async_trait]
impl EventSink for Reporter {
    async fn on_begin(&self, worker: WorkerId, endpoint: &Endpoint) {
        info!(
            worker = worker.0,
            source = endpoint.sequence,
            host = %endpoint.host,
            port = endpoint.port,
            "begin"
        );
    }

    async fn on_success(&self, worker: WorkerId, endpoint: &Endpoint, result: &ProbeResult) {
        let elapsed_micros = result.elapsed_micros();
        info!(
            worker = worker.0,
            source = endpoint.sequence,
            host = %endpoint.host,
            port = endpoint.port,
            elapsed_us = elapsed_micros,
            "done"
        );

        Self::append_line(&self.good, &endpoint.raw_line);
        Self::append_row(
            &self.good_csv,
            GoodRow {
                host: &endpoint.host,
                port: endpoint.port,
                elapsed_micros,
            },
        );
        self.run_hook(endpoint, elapsed_micros).await;
    }

    async fn on_failure(&self, worker: WorkerId, endpoint: &Endpoint, result: &ProbeResult) {
        let elapsed_micros = result.elapsed_micros();
        info!(
            worker = worker.0,
            source = endpoint.sequence,
            host = %endpoint.host,
            port = endpoint.port,
            elapsed_us = elapsed_micros,
            kind = result.error_kind.map(|k| k.as_str()).unwrap_or("unknown"),
            error = result.error_message.as_deref().unwrap_or(""),
            "error"
        );

        Self::append_line(&self.bad, &endpoint.raw_line);
        Self::append_row(
            &self.bad_csv,
            BadRow {
                host: &endpoint.host,
                port: endpoint.port,
                elapsed_micros,
                error_kind: result.error_kind,
                error_message: result.error_message.as_deref(),
            },
        );
    }
}
