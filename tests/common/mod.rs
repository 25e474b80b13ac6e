//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A raw-TCP downstream that answers with scripted statuses and records bodies.
#[derive(Clone)]
pub struct MockDownstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl MockDownstream {
    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

/// Start a downstream on an ephemeral port. `status` receives the 0-based call number.
pub async fn start_programmable_downstream<F>(status: F) -> MockDownstream
where
    F: Fn(u32) -> u16 + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = MockDownstream {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicU32::new(0)),
        bodies: Arc::new(Mutex::new(Vec::new())),
    };
    let status = Arc::new(status);

    let state = mock.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let state = state.clone();
                    let status = status.clone();
                    tokio::spawn(async move {
                        handle(socket, state, status).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    mock
}

/// Start a downstream that always answers `status`.
pub async fn start_mock_downstream(status: u16) -> MockDownstream {
    start_programmable_downstream(move |_| status).await
}

async fn handle<F>(mut socket: TcpStream, state: MockDownstream, status: Arc<F>)
where
    F: Fn(u32) -> u16 + Send + Sync + 'static,
{
    let Some(body) = read_request_body(&mut socket).await else {
        return;
    };
    if let Ok(value) = serde_json::from_slice::<Value>(&body) {
        state.bodies.lock().unwrap().push(value);
    }
    let n = state.calls.fetch_add(1, Ordering::SeqCst);
    let code = status(n);

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Length: 4\r\nConnection: close\r\n\r\nmock",
        code
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(buf[header_end..].to_vec())
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Write a configuration directory under the system temp dir.
pub fn write_confdir(routes: &str, rules: &str, templates: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("webrehook-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("templates")).unwrap();
    std::fs::write(dir.join("routes.yml"), routes).unwrap();
    std::fs::write(dir.join("rules.yml"), rules).unwrap();
    for (name, source) in templates {
        std::fs::write(dir.join("templates").join(name), source).unwrap();
    }
    dir
}

/// Poll `cond` until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
