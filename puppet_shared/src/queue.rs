//! Cross-thread command queue.
//!
//! The one structure in the pipeline with multiple writers (transport
//! listeners) and a single reader (the tick consumer). Producers push
//! self-contained command values; nothing here touches merge state.
//!
//! Contract:
//! - `push` is safe from any thread and never blocks beyond the mutex.
//! - `drain` removes everything queued at that instant, in FIFO order
//!   across all producers combined. A push racing with a drain lands in a
//!   later drain, never in a partially-read one.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::command::{RemoteCommand, Transport};

/// One queued command, tagged with its producing transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedCommand {
    pub source: Transport,
    pub command: RemoteCommand,
}

/// FIFO of pending commands, shared via `Arc` between the listeners and
/// the tick loop. Constructed once by the composition root.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<VecDeque<QueuedCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one command. Never drops, never blocks beyond the lock.
    pub fn push(&self, source: Transport, command: RemoteCommand) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.push_back(QueuedCommand { source, command });
    }

    /// Takes every command queued so far. Single-consumer: called from the
    /// tick loop only, once per tick.
    pub fn drain(&self) -> Vec<QueuedCommand> {
        let drained = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *pending)
        };
        Vec::from(drained)
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
