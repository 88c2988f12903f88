//! Proxy list parser producing sequenced endpoints

use crate::error::{Error, Result};
use crate::proxy::models::Endpoint;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error};

/// Parser for HOST:PORT proxy lines
pub struct EndpointParser;

impl EndpointParser {
    /// Parse a single proxy line into host and port
    ///
    /// The line is split on its last `:`, so bracketed IPv6 literals such as
    /// `[::1]:1080` keep their inner colons in the host part. Returns `None`
    /// for empty lines, lines without a colon and lines whose port is not an
    /// integer in the `u16` range.
    pub fn parse_line(line: &str) -> Option<(String, u16)> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (host, port) = line.rsplit_once(':')?;
        let port: u16 = port.trim().parse().ok()?;

        Some((host.to_string(), port))
    }

    /// Parse endpoints from a string (multiple lines)
    pub fn parse_string(content: &str) -> Vec<Endpoint> {
        EndpointReader::new(content.as_bytes()).collect()
    }

    /// Open a proxy list file for lazy reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<EndpointReader<BufReader<File>>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::unreadable_source(path, e))?;
        Ok(EndpointReader::new(BufReader::new(file)))
    }
}

/// Lazy iterator over the endpoints of a line-oriented source
///
/// Bytes are decoded as UTF-8 with replacement. Unparseable lines are
/// skipped without consuming a sequence number. A read error ends the
/// stream.
pub struct EndpointReader<R> {
    reader: R,
    buf: Vec<u8>,
    next_sequence: u64,
    finished: bool,
}

impl<R: BufRead> EndpointReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            next_sequence: 1,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for EndpointReader<R> {
    type Item = Endpoint;

    fn next(&mut self) -> Option<Endpoint> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    match EndpointParser::parse_line(&line) {
                        Some((host, port)) => {
                            let sequence = self.next_sequence;
                            self.next_sequence += 1;
                            return Some(Endpoint::new(
                                sequence,
                                line.trim().to_string(),
                                host,
                                port,
                            ));
                        }
                        None => debug!(line = %line.trim(), "skipping unparseable source line"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to read proxy source, treating it as exhausted");
                    self.finished = true;
                }
            }
        }

        None
    }
}
