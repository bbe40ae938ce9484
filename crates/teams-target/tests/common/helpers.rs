// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use std::time::Duration;

use serde_json::Value;
use teams_target::{LogEvent, LogLevel, TargetConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::mocks::{RECORDING_CARD, TEST_LOCATION};

/// Target configuration posting to `url` through the recording card.
pub fn recording_config(url: String, application_name: &str, environment: &str) -> TargetConfig {
    TargetConfig::new(url, application_name, environment)
        .with_formatter(RECORDING_CARD, TEST_LOCATION)
}

pub fn disk_full_event() -> LogEvent {
    LogEvent::new(LogLevel::Error, "billing.storage", "disk full")
        .with_property("volume", "/var/lib/billing")
}

/// Looks up a fact of a `MessageCard` payload by name.
pub fn fact<'a>(card: &'a Value, name: &str) -> Option<&'a str> {
    card["sections"][0]["facts"]
        .as_array()?
        .iter()
        .find(|fact| fact["name"] == name)
        .and_then(|fact| fact["value"].as_str())
}

/// Starts a webhook endpoint speaking raw HTTP/1.1. Every request is read in
/// full and its body is sent on the returned channel; the endpoint then waits
/// `delay` and answers with `status_line` (e.g. `HTTP/1.1 500 Server Error`).
pub async fn scripted_endpoint(
    status_line: &'static str,
    delay: Duration,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("unable to bind TCP listener");
    let addr = listener.local_addr().expect("listener has no address");
    let (received_tx, received_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let received_tx = received_tx.clone();
            tokio::spawn(async move {
                let Ok(body) = read_request(&mut socket).await else {
                    return;
                };
                let _ = received_tx.send(body);
                tokio::time::sleep(delay).await;
                let response =
                    format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/hook"), received_rx)
}

/// Reads one request and returns its body.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = head_end + 4;
        if buf.len() >= body_start + content_length {
            let body = &buf[body_start..body_start + content_length];
            return Ok(String::from_utf8_lossy(body).into_owned());
        }
    }
}
