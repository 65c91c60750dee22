//! Minimal HTTP/1.1 server for integration tests.
//!
//! Every request gets the same status line and body, `Range` is ignored
//! unless the server is told to reject ranged requests. Clients that hang up
//! early (the content sniff does) are tolerated.

#![allow(dead_code)]

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serve `body` with `200 OK` and return the URL to fetch it from.
pub async fn serve(body: Vec<u8>) -> String {
    serve_with_status("200 OK", body).await
}

pub async fn serve_with_status(status: &'static str, body: Vec<u8>) -> String {
    start(status, body, false).await
}

/// Like [`serve`], but any request carrying a `Range` header gets
/// `500 Internal Server Error`, so content sniffing fails.
pub async fn serve_rejecting_range(body: Vec<u8>) -> String {
    start("200 OK", body, true).await
}

async fn start(status: &'static str, body: Vec<u8>, reject_range: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let body = Arc::clone(&body);
            tokio::spawn(respond(socket, status, body, reject_range));
        }
    });

    format!("http://{}/image.bin", addr)
}

async fn respond(
    mut socket: TcpStream,
    status: &'static str,
    body: Arc<Vec<u8>>,
    reject_range: bool,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let ranged = String::from_utf8_lossy(&request)
        .lines()
        .any(|line| line.to_ascii_lowercase().starts_with("range:"));
    if reject_range && ranged {
        let _ = socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await;
        let _ = socket.shutdown().await;
        return;
    }

    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    if socket.write_all(header.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(&body).await;
    let _ = socket.shutdown().await;
}

/// Deterministic non-repeating-ish test content.
pub fn content(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u32 * 31 + (i as u32 >> 8) + seed as u32) % 251) as u8)
        .collect()
}
