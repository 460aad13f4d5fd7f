//! Listener and connection settings.

use serde::{Deserialize, Serialize};

/// WebSocket listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
    /// HTTP path that upgrades to the signaling WebSocket.
    pub subpath: String,
    /// Outbound frames buffered per connection before senders wait.
    pub send_queue: usize,
    /// Seconds between keepalive pings.
    pub ping_interval_secs: u64,
    /// Seconds of silence after which a client is dropped.
    pub pong_timeout_secs: u64,
    /// Largest accepted inbound message in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4443,
            subpath: "/pilot/center".to_string(),
            send_queue: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 90,
            max_message_size: 2 * 1024 * 1024,
        }
    }
}
