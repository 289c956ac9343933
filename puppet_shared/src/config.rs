//! Configuration system.
//!
//! Loads service configuration from JSON strings/files (file IO left to
//! the binary). Every backend option is statically typed; nothing is
//! resolved by runtime introspection.

use serde::{Deserialize, Serialize};

use crate::merge::Smoothing;

/// Root configuration for the remote-control service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Socket text-protocol listen address.
    #[serde(default = "default_socket_addr")]
    pub socket_addr: String,
    /// HTTP control-page listen address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    /// Fixed simulation tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Whether local keyboard test input participates in the merge.
    #[serde(default = "default_keyboard_enabled")]
    pub keyboard_enabled: bool,
    #[serde(default)]
    pub smoothing: Smoothing,
    /// Seconds without a remote `move` before mobile input zeroes.
    /// `None` keeps the last input indefinitely, like the original
    /// deployment.
    #[serde(default)]
    pub mobile_idle_timeout_secs: Option<f32>,
    /// Real-time store subscription; the transport is skipped when unset.
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

/// Connection options for the hosted real-time store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database root URL, e.g. `https://example-rtdb.firebaseio.com`.
    pub database_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_socket_addr() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_hz() -> u32 {
    60
}

fn default_keyboard_enabled() -> bool {
    true
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket_addr: default_socket_addr(),
            http_addr: default_http_addr(),
            tick_hz: default_tick_hz(),
            keyboard_enabled: default_keyboard_enabled(),
            smoothing: Smoothing::default(),
            mobile_idle_timeout_secs: None,
            store: None,
        }
    }
}

impl ControlConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
