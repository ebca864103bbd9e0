//! Webhook Sink
//!
//! Minimal HTTP endpoint that captures completion webhook deliveries so
//! tests can assert on the posted body. Binds an ephemeral port, answers
//! every request with a configurable status, and forwards each JSON body
//! over a channel.

#![allow(dead_code)]

use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub struct WebhookSink {
    url: String,
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl WebhookSink {
    /// Start a sink answering 200 OK.
    pub async fn start() -> Self {
        Self::start_with_status(200).await
    }

    /// Start a sink answering the given status code.
    pub async fn start_with_status(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind sink");
        let addr = listener.local_addr().expect("sink local addr");
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let sender = sender.clone();
                tokio::spawn(handle_connection(socket, status, sender));
            }
        });

        Self {
            url: format!("http://{addr}/completion"),
            receiver,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next delivered body.
    pub async fn next_delivery(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .expect("webhook should arrive within 2s")
            .expect("sink task should stay alive")
    }

    /// Already-delivered body, if any.
    pub fn try_delivery(&mut self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }
}

async fn handle_connection(
    mut socket: tokio::net::TcpStream,
    status: u16,
    sender: mpsc::UnboundedSender<Value>,
) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    let body = loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
        if let Some(body) = extract_body(&raw) {
            break body;
        }
    };

    let response =
        format!("HTTP/1.1 {status} OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;

    if let Ok(value) = serde_json::from_slice(&body) {
        let _ = sender.send(value);
    }
}

/// Body bytes once the request is complete per its content-length header.
fn extract_body(raw: &[u8]) -> Option<Vec<u8>> {
    let headers_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = std::str::from_utf8(&raw[..headers_end]).ok()?;
    let content_length = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    })?;
    let body = raw.get(headers_end..headers_end + content_length)?;
    Some(body.to_vec())
}
