//! Per-transport connection telemetry.
//!
//! Advisory only: the merge policy never consults it. Counters are
//! monotonic; `last_seen` tracks the most recent decoded command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::command::Transport;

#[derive(Debug, Default)]
pub struct TransportStatus {
    clients: AtomicU64,
    commands: AtomicU64,
    last_seen: Mutex<Option<Instant>>,
}

impl TransportStatus {
    pub fn client_connected(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_seen(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
        *self
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn clients(&self) -> u64 {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn seconds_since_last(&self) -> Option<f32> {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|t| t.elapsed().as_secs_f32())
    }
}

/// One status slot per transport.
#[derive(Debug, Default)]
pub struct StatusBoard {
    socket: TransportStatus,
    http: TransportStatus,
    store: TransportStatus,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self, transport: Transport) -> &TransportStatus {
        match transport {
            Transport::Socket => &self.socket,
            Transport::Http => &self.http,
            Transport::Store => &self.store,
        }
    }

    /// Human-readable lines for the operator console.
    pub fn summary(&self) -> Vec<String> {
        [Transport::Socket, Transport::Http, Transport::Store]
            .into_iter()
            .map(|transport| {
                let status = self.transport(transport);
                let last = match status.seconds_since_last() {
                    Some(secs) => format!("{secs:.1}s ago"),
                    None => "never".to_string(),
                };
                format!(
                    "{transport}: {} client(s), {} command(s), last command {last}",
                    status.clients(),
                    status.commands()
                )
            })
            .collect()
    }
}
