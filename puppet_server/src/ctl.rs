//! Tick consumer and operator console.
//!
//! `ControlLoop` is the single consumer of the command queue and the only
//! writer of the merge state. One `step` per simulation tick: drain the
//! queue, apply every command in FIFO order, advance the merge state, hand
//! the frame's direction and interact pulse to the sink. The loop never
//! blocks on transport I/O — it only drains what is already queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use puppet_shared::config::ControlConfig;
use puppet_shared::merge::{InputMergeState, KeyboardSample};
use puppet_shared::queue::CommandQueue;
use puppet_shared::sink::MotionSink;
use puppet_shared::status::StatusBoard;

/// Result of one operator console line.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleAction {
    Continue(Vec<String>),
    Quit,
}

pub struct ControlLoop {
    state: InputMergeState,
    queue: Arc<CommandQueue>,
    status: Arc<StatusBoard>,
    keys: KeyboardSample,
    tick_hz: u32,
    tick: u64,
}

impl ControlLoop {
    pub fn new(cfg: &ControlConfig, queue: Arc<CommandQueue>, status: Arc<StatusBoard>) -> Self {
        Self {
            state: InputMergeState::new(
                cfg.smoothing,
                cfg.keyboard_enabled,
                cfg.mobile_idle_timeout_secs,
            ),
            queue,
            status,
            keys: KeyboardSample::default(),
            tick_hz: cfg.tick_hz,
            tick: 0,
        }
    }

    /// Executes one fixed simulation step.
    pub fn step(&mut self, dt: f32, sink: &mut dyn MotionSink) {
        for queued in self.queue.drain() {
            debug!(source = %queued.source, command = ?queued.command, "applying command");
            self.state.apply(queued.command);
        }
        self.state.tick(self.keys, dt);

        if self.state.consume_interact_pulse() {
            sink.interact();
        }
        sink.apply_direction(self.state.current_direction(), dt);
        self.tick += 1;
    }

    /// Executes an operator console line.
    pub fn exec_console(&mut self, line: &str) -> ConsoleAction {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            return ConsoleAction::Continue(Vec::new());
        };
        match command {
            "status" => {
                let mut out = self.status.summary();
                out.push(format!("queue: {} pending", self.queue.len()));
                let dir = self.state.current_direction();
                out.push(format!(
                    "tick: {}, direction: ({:.2}, {:.2})",
                    self.tick, dir.x, dir.y
                ));
                ConsoleAction::Continue(out)
            }
            "kb" => {
                let Some(&held) = tokens.get(1) else {
                    return ConsoleAction::Continue(vec!["usage: kb <wasd|none>".to_string()]);
                };
                let mut keys = KeyboardSample::default();
                if held != "none" {
                    for ch in held.chars() {
                        match ch {
                            'w' => keys.up = true,
                            'a' => keys.left = true,
                            's' => keys.down = true,
                            'd' => keys.right = true,
                            other => {
                                return ConsoleAction::Continue(vec![format!(
                                    "unknown key '{other}' (use w/a/s/d or none)"
                                )]);
                            }
                        }
                    }
                }
                self.keys = keys;
                ConsoleAction::Continue(vec![format!("holding {held}")])
            }
            "interact" => {
                self.state.press_keyboard_interact();
                ConsoleAction::Continue(Vec::new())
            }
            "quit" | "exit" => ConsoleAction::Quit,
            other => ConsoleAction::Continue(vec![format!("unknown command: {other}")]),
        }
    }

    pub fn merge_state(&self) -> &InputMergeState {
        &self.state
    }

    pub fn hold_keys(&mut self, keys: KeyboardSample) {
        self.keys = keys;
    }

    /// Runs steps at the configured tick rate until shutdown. Console
    /// lines are handled between ticks; `quit` broadcasts shutdown so the
    /// transports wind down with the loop.
    pub async fn run(
        mut self,
        mut sink: impl MotionSink,
        mut console_rx: mpsc::Receiver<String>,
        shutdown_tx: Arc<watch::Sender<bool>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let dt = 1.0 / self.tick_hz as f32;
        let mut ticks = tokio::time::interval(Duration::from_secs_f32(dt));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticks.tick() => self.step(dt, &mut sink),
                Some(line) = console_rx.recv() => match self.exec_console(&line) {
                    ConsoleAction::Continue(out) => {
                        for line in out {
                            println!("{line}");
                        }
                    }
                    ConsoleAction::Quit => {
                        info!("operator requested shutdown");
                        let _ = shutdown_tx.send(true);
                    }
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!(ticks = self.tick, "control loop ended");
        Ok(())
    }
}
