//! Remote-control service binary.
//!
//! Usage:
//!   cargo run -p puppet_server -- [--config control.json] [--socket-addr 0.0.0.0:8888]
//!       [--http-addr 0.0.0.0:8080] [--tick-hz 60] [--store-url https://...] [--no-keyboard]
//!
//! Listens on three transports (raw socket text protocol, HTTP control
//! page, optional real-time store subscription), funnels every decoded
//! command into one queue, and drains it once per simulation tick.
//!
//! Console commands:
//!   status          - transport telemetry and current direction
//!   kb <wasd|none>  - hold local test keys
//!   interact        - local interact edge
//!   quit            - shutdown

use std::env;
use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use puppet_server::{bind_or_loopback, ctl::ControlLoop, http, socket::SocketListener, store};
use puppet_shared::config::{ControlConfig, StoreConfig};
use puppet_shared::queue::CommandQueue;
use puppet_shared::sink::TracingSink;
use puppet_shared::status::StatusBoard;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<ControlConfig> {
    let args: Vec<String> = env::args().collect();
    let mut cfg = ControlConfig::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                let text = std::fs::read_to_string(&args[i + 1])
                    .with_context(|| format!("read config {}", args[i + 1]))?;
                cfg = ControlConfig::from_json_str(&text).context("parse config")?;
                i += 2;
            }
            "--socket-addr" if i + 1 < args.len() => {
                cfg.socket_addr = args[i + 1].clone();
                i += 2;
            }
            "--http-addr" if i + 1 < args.len() => {
                cfg.http_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(60);
                i += 2;
            }
            "--store-url" if i + 1 < args.len() => {
                let auth_token = cfg.store.take().and_then(|s| s.auth_token);
                cfg.store = Some(StoreConfig {
                    database_url: args[i + 1].clone(),
                    auth_token,
                });
                i += 2;
            }
            "--no-keyboard" => {
                cfg.keyboard_enabled = false;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        socket = %cfg.socket_addr,
        http = %cfg.http_addr,
        tick_hz = cfg.tick_hz,
        store = cfg.store.is_some(),
        "starting remote-control service"
    );

    let queue = Arc::new(CommandQueue::new());
    let status = Arc::new(StatusBoard::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Raw socket transport. Startup failure is non-fatal: the other
    // transports keep the character controllable.
    match bind_or_loopback(&cfg.socket_addr, "socket").await {
        Ok(listener) => {
            let listener = SocketListener::new(listener);
            let queue = Arc::clone(&queue);
            let status = Arc::clone(&status);
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = listener.run(queue, status, shutdown).await {
                    warn!(error = %e, "socket transport stopped");
                }
            });
        }
        Err(e) => warn!(error = %e, "socket transport unavailable"),
    }

    // HTTP transport (control page + POST /control).
    match bind_or_loopback(&cfg.http_addr, "http").await {
        Ok(listener) => {
            let state = http::HttpState {
                queue: Arc::clone(&queue),
                status: Arc::clone(&status),
            };
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = http::serve(listener, state, shutdown).await {
                    warn!(error = %e, "http transport stopped");
                }
            });
        }
        Err(e) => warn!(error = %e, "http transport unavailable"),
    }

    // Store subscription, only when configured.
    if let Some(store_cfg) = cfg.store.clone() {
        let queue = Arc::clone(&queue);
        let status = Arc::clone(&status);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = store::run(store_cfg, queue, status, shutdown).await {
                warn!(error = %e, "store transport stopped");
            }
        });
    } else {
        info!("store transport not configured");
    }

    // Ctrl-C → cooperative shutdown.
    {
        let shutdown_tx = Arc::clone(&shutdown_tx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    // Operator console on stdin.
    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Remote control ready. Commands: status, kb <wasd|none>, interact, quit.");

    let ctl = ControlLoop::new(&cfg, Arc::clone(&queue), Arc::clone(&status));
    ctl.run(
        TracingSink::default(),
        console_rx,
        Arc::clone(&shutdown_tx),
        shutdown_rx,
    )
    .await
}
