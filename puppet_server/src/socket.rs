//! Raw socket text transport.
//!
//! Accepts TCP connections and reads newline-delimited UTF-8 commands
//! (`"move,<x>,<y>"`, `"interact"`). Fire-and-forget: no acknowledgement
//! frames. A malformed line is logged and dropped; it never ends the
//! connection. Concurrent connections are allowed — the queue serializes
//! them, last writer wins per channel.
//!
//! Shutdown is cooperative: every blocking await races the shutdown
//! channel, and dropping the listener is what unblocks the final accept.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use puppet_shared::command::{decode_line, Transport};
use puppet_shared::queue::CommandQueue;
use puppet_shared::status::StatusBoard;

pub struct SocketListener {
    listener: TcpListener,
}

impl SocketListener {
    pub fn new(listener: TcpListener) -> Self {
        Self { listener }
    }

    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("socket bind")?;
        Ok(Self::new(listener))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Each connection is served by its own task until the
    /// peer disconnects or shutdown flips.
    pub async fn run(
        self,
        queue: Arc<CommandQueue>,
        status: Arc<StatusBoard>,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(addr = %self.listener.local_addr()?, "socket control listening");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "controller connected");
                        status.transport(Transport::Socket).client_connected();
                        tokio::spawn(read_commands(
                            stream,
                            peer,
                            Arc::clone(&queue),
                            Arc::clone(&status),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "socket accept failed"),
                },
            }
        }
        Ok(())
    }
}

async fn read_commands(
    stream: TcpStream,
    peer: SocketAddr,
    queue: Arc<CommandQueue>,
    status: Arc<StatusBoard>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_line(&line) {
                        Ok(command) => {
                            debug!(%peer, ?command, "socket command");
                            queue.push(Transport::Socket, command);
                            status.transport(Transport::Socket).command_seen();
                        }
                        Err(e) => {
                            warn!(%peer, line = %line.trim(), error = %e, "dropping malformed command");
                        }
                    }
                }
                Ok(None) => {
                    info!(%peer, "controller disconnected");
                    break;
                }
                Err(e) => {
                    warn!(%peer, error = %e, "socket read failed");
                    break;
                }
            },
        }
    }
}
