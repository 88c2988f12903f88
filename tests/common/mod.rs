//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use socks_check::proxy::{Endpoint, ErrorKind, EventSink, ProbeResult, WorkerId};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn endpoints(count: u64) -> Vec<Endpoint> {
    (1..=count)
        .map(|i| {
            let host = format!("10.0.{}.{}", i / 256, i % 256);
            Endpoint::new(i, format!("{}:1080", host), host, 1080)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Begin,
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub worker: WorkerId,
    pub kind: EventKind,
    pub endpoint: Endpoint,
    pub error_kind: Option<ErrorKind>,
    pub at: Instant,
}

/// Sink recording every callback in call order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    /// Sequences of all endpoints that reached success or failure, sorted.
    pub fn finished_sequences(&self) -> Vec<u64> {
        let mut seqs: Vec<u64> = self
            .events()
            .into_iter()
            .filter(|e| e.kind != EventKind::Begin)
            .map(|e| e.endpoint.sequence)
            .collect();
        seqs.sort_unstable();
        seqs
    }

    fn record(&self, worker: WorkerId, kind: EventKind, endpoint: &Endpoint, error_kind: Option<ErrorKind>) {
        self.events.lock().unwrap().push(Event {
            worker,
            kind,
            endpoint: endpoint.clone(),
            error_kind,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn on_begin(&self, worker: WorkerId, endpoint: &Endpoint) {
        self.record(worker, EventKind::Begin, endpoint, None);
    }

    async fn on_success(&self, worker: WorkerId, endpoint: &Endpoint, _result: &ProbeResult) {
        self.record(worker, EventKind::Success, endpoint, None);
    }

    async fn on_failure(&self, worker: WorkerId, endpoint: &Endpoint, result: &ProbeResult) {
        self.record(worker, EventKind::Failure, endpoint, result.error_kind);
    }
}

async fn read_request_head(socket: &mut TcpStream) -> io::Result<()> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if socket.read(&mut byte).await? == 0 {
            break;
        }
        head.push(byte[0]);
    }
    Ok(())
}

/// Start an HTTP backend answering every request with a fixed status and body.
pub async fn start_http_backend(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request_head(&mut socket).await.is_err() {
                    return;
                }
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start an HTTP backend that announces `length` body bytes and sends one per `pause`.
pub async fn start_trickling_backend(length: usize, pause: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request_head(&mut socket).await.is_err() {
                    return;
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    length
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for _ in 0..length {
                    tokio::time::sleep(pause).await;
                    if socket.write_all(b"x").await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// Start a minimal SOCKS5 proxy (no auth, CONNECT only) relaying to the target.
pub async fn start_socks5_proxy() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut client, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socks5_relay(&mut client).await;
            });
        }
    });

    addr
}

async fn socks5_relay(client: &mut TcpStream) -> io::Result<()> {
    let mut greeting = [0u8; 2];
    client.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[0x05, 0x00]).await?;

    let mut request = [0u8; 4];
    client.read_exact(&mut request).await?;
    let host = match request[3] {
        0x01 => {
            let mut ip = [0u8; 4];
            client.read_exact(&mut ip).await?;
            Ipv4Addr::from(ip).to_string()
        }
        0x03 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            client.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
        0x04 => {
            let mut ip = [0u8; 16];
            client.read_exact(&mut ip).await?;
            Ipv6Addr::from(ip).to_string()
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported address type {}", other),
            ))
        }
    };
    let mut port = [0u8; 2];
    client.read_exact(&mut port).await?;
    let port = u16::from_be_bytes(port);

    let mut upstream = TcpStream::connect((host.as_str(), port)).await?;
    client
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await?;

    io::copy_bidirectional(client, &mut upstream).await?;
    Ok(())
}

/// Start a listener that accepts connections and never answers.
pub async fn start_silent_proxy() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
