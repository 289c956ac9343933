//! Real-time store subscription transport.
//!
//! Subscribes to the two logical keys independently over the store's
//! streaming HTTP API (`text/event-stream` framing; `put`/`patch` events
//! carry `{"path": ..., "data": ...}`). Each notification decodes only its
//! own key. Malformed payloads are logged and dropped; the listener
//! reconnects with a fixed backoff on any stream error or EOF and keeps
//! listening until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use puppet_shared::command::{decode_store_value, StoreKey, Transport};
use puppet_shared::config::StoreConfig;
use puppet_shared::queue::CommandQueue;
use puppet_shared::status::StatusBoard;

/// Delay between reconnect attempts after a stream error or EOF.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Runs both key subscriptions until shutdown.
pub async fn run(
    cfg: StoreConfig,
    queue: Arc<CommandQueue>,
    status: Arc<StatusBoard>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .build()
        .context("build store client")?;
    tokio::join!(
        watch_key(
            client.clone(),
            cfg.clone(),
            StoreKey::Joystick,
            Arc::clone(&queue),
            Arc::clone(&status),
            shutdown.clone(),
        ),
        watch_key(client, cfg, StoreKey::Interact, queue, status, shutdown),
    );
    Ok(())
}

async fn watch_key(
    client: reqwest::Client,
    cfg: StoreConfig,
    key: StoreKey,
    queue: Arc<CommandQueue>,
    status: Arc<StatusBoard>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        match stream_key(&client, &cfg, key, &queue, &status, &mut shutdown).await {
            Ok(()) => debug!(key = key.path(), "store stream ended"),
            Err(e) => warn!(key = key.path(), error = %e, "store stream failed"),
        }
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

/// One subscription attempt: connect, then decode events until the stream
/// ends or shutdown flips. Returning `Ok` hands control back to the
/// reconnect loop.
async fn stream_key(
    client: &reqwest::Client,
    cfg: &StoreConfig,
    key: StoreKey,
    queue: &CommandQueue,
    status: &StatusBoard,
    shutdown: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let url = format!(
        "{}/{}.json",
        cfg.database_url.trim_end_matches('/'),
        key.path()
    );
    let mut request = client.get(&url).header(ACCEPT, "text/event-stream");
    if let Some(token) = &cfg.auth_token {
        request = request.query(&[("auth", token.as_str())]);
    }
    let response = request
        .send()
        .await
        .context("store subscribe")?
        .error_for_status()
        .context("store subscribe status")?;

    info!(key = key.path(), "store subscription established");
    status.transport(Transport::Store).client_connected();

    let mut body = response.bytes_stream();
    let mut buf = BytesMut::new();
    let mut event = SseEvent::default();
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
            chunk = body.next() => {
                let Some(chunk) = chunk else {
                    return Ok(());
                };
                buf.extend_from_slice(&chunk.context("store stream read")?);
                while let Some(line) = take_line(&mut buf) {
                    if let Some(finished) = event.feed(&line) {
                        handle_event(key, &finished, queue, status);
                    }
                }
            }
        }
    }
}

/// One `event:`/`data:` frame of the stream, assembled line by line.
#[derive(Debug, Default)]
struct SseEvent {
    name: String,
    data: String,
}

impl SseEvent {
    /// Feeds one line; the blank separator line completes the frame.
    fn feed(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.name.is_empty() && self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(self));
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.trim_start());
        }
        None
    }
}

/// Splits the next `\n`-terminated line off the buffer, stripping `\r`.
fn take_line(buf: &mut BytesMut) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line = buf.split_to(pos + 1);
    let line = &line[..line.len() - 1];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some(String::from_utf8_lossy(line).into_owned())
}

fn handle_event(key: StoreKey, event: &SseEvent, queue: &CommandQueue, status: &StatusBoard) {
    match event.name.as_str() {
        "put" | "patch" => {}
        "keep-alive" => return,
        other => {
            debug!(key = key.path(), event = other, "ignoring store event");
            return;
        }
    }
    let parsed: serde_json::Value = match serde_json::from_str(&event.data) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = key.path(), error = %e, "dropping unparseable store event");
            return;
        }
    };
    let path = parsed.get("path").and_then(|p| p.as_str()).unwrap_or("/");
    if path != "/" {
        debug!(key = key.path(), path, "ignoring partial store update");
        return;
    }
    let data = parsed.get("data").unwrap_or(&serde_json::Value::Null);
    match decode_store_value(key, data) {
        Ok(Some(command)) => {
            debug!(key = key.path(), ?command, "store command");
            queue.push(Transport::Store, command);
            status.transport(Transport::Store).command_seen();
        }
        Ok(None) => {}
        Err(e) => warn!(key = key.path(), error = %e, "dropping malformed store value"),
    }
}
