//! Command model and per-transport decoders.
//!
//! Every transport normalizes its native framing into a [`RemoteCommand`]
//! before anything reaches the queue:
//! - socket: newline-delimited text, `"move,<x>,<y>"` or `"interact"`
//! - http: JSON body with `joystickX`/`joystickY`/`interact`
//! - store: value-changed notifications for two independent keys
//!
//! Decode errors are for the caller to log and drop; a malformed command
//! must never end a listener.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized control command from any transport.
///
/// Move components are forwarded as received; nothing clamps them at
/// decode time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Move { x: f32, y: f32 },
    Interact,
}

/// Which transport produced a command. Used for telemetry and log fields
/// only; the queue gives no priority between transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Socket,
    Http,
    Store,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Socket => write!(f, "socket"),
            Transport::Http => write!(f, "http"),
            Transport::Store => write!(f, "store"),
        }
    }
}

/// Decodes one line of the socket text protocol.
///
/// `move` takes exactly two numeric fields. `interact` fires on the first
/// token and ignores trailing fields.
pub fn decode_line(line: &str) -> anyhow::Result<RemoteCommand> {
    let parts: Vec<&str> = line.trim().split(',').collect();
    match parts[0] {
        "move" => {
            if parts.len() != 3 {
                bail!("move takes 2 fields, got {}", parts.len() - 1);
            }
            let x: f32 = parts[1].trim().parse().context("move x")?;
            let y: f32 = parts[2].trim().parse().context("move y")?;
            Ok(RemoteCommand::Move { x, y })
        }
        "interact" => Ok(RemoteCommand::Interact),
        other => bail!("unknown command {other:?}"),
    }
}

/// Body of a `POST /control` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPayload {
    pub joystick_x: f32,
    pub joystick_y: f32,
    pub interact: bool,
}

impl ControlPayload {
    /// Every request forwards its joystick values as a `Move`, whatever
    /// their magnitude; `interact == true` adds an `Interact` after it.
    pub fn commands(self) -> Vec<RemoteCommand> {
        let mut commands = vec![RemoteCommand::Move {
            x: self.joystick_x,
            y: self.joystick_y,
        }];
        if self.interact {
            commands.push(RemoteCommand::Interact);
        }
        commands
    }
}

/// Logical keys of the hosted real-time store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Joystick,
    Interact,
}

impl StoreKey {
    pub fn path(self) -> &'static str {
        match self {
            StoreKey::Joystick => "controller/joystick",
            StoreKey::Interact => "controller/interact",
        }
    }
}

/// Decodes a store value-changed notification for one key.
///
/// `Ok(None)` means the notification carries no command: the key is
/// absent/deleted, or the interact value released back to false/zero.
pub fn decode_store_value(key: StoreKey, value: &Value) -> anyhow::Result<Option<RemoteCommand>> {
    if value.is_null() {
        return Ok(None);
    }
    match key {
        StoreKey::Joystick => {
            let x = value
                .get("x")
                .and_then(|v| v.as_f64())
                .context("joystick value missing numeric x")?;
            let y = value
                .get("y")
                .and_then(|v| v.as_f64())
                .context("joystick value missing numeric y")?;
            Ok(Some(RemoteCommand::Move {
                x: x as f32,
                y: y as f32,
            }))
        }
        StoreKey::Interact => match value {
            Value::Bool(pressed) => Ok(pressed.then_some(RemoteCommand::Interact)),
            Value::Number(n) => {
                let n = n.as_i64().context("interact value is not an integer")?;
                Ok((n != 0).then_some(RemoteCommand::Interact))
            }
            other => bail!("interact value has unsupported type: {other}"),
        },
    }
}
