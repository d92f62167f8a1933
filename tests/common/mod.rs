//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::error::Error;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use telemetry_facade::{Context, Facility, Transport, CORRELATION_ID_KEY};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock backend on an ephemeral port that answers every request
/// with `status` and reports the correlation header it received.
pub async fn start_mock_backend(
    status: u16,
) -> (SocketAddr, mpsc::UnboundedReceiver<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let _ = tx.send(header_value(&head, CORRELATION_ID_KEY));

                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            status_text
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// Facility that records calls under its own name and marks the contexts it
/// starts, so the facility that produced a context can be identified.
#[derive(Clone)]
pub struct NamedFacility {
    pub name: &'static str,
    pub calls: Arc<Mutex<Vec<String>>>,
}

struct StartedBy(&'static str);

impl NamedFacility {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Name of the facility whose `start_span` produced `ctx`.
    pub fn started_by(ctx: &Context) -> Option<&'static str> {
        ctx.get::<StartedBy>().map(|s| s.0)
    }
}

impl Facility for NamedFacility {
    fn new_transport(&self, base: Transport) -> Transport {
        self.calls.lock().unwrap().push("new_transport".into());
        base
    }

    fn start_span(&self, ctx: Context, name: &str) -> Context {
        self.calls.lock().unwrap().push(format!("start {}", name));
        ctx.with_value(StartedBy(self.name))
    }

    fn end_span(&self, ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>) {
        let by = Self::started_by(ctx).unwrap_or("-");
        let err = err.map(ToString::to_string).unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push(format!("end {} {} {}", by, status_code, err).trim_end().to_string());
    }
}

/// In-memory writer for JSON sinks.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
