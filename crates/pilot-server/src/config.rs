//! Server configuration.

use std::time::Duration;

use pilot_settings::PilotSettings;
use serde::{Deserialize, Serialize};

/// Configuration for [`PilotServer`](crate::PilotServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Path serving the WebSocket upgrade.
    pub subpath: String,
    /// Outbound frames buffered per session.
    pub send_queue: usize,
    /// Seconds between Ping frames.
    pub ping_interval_secs: u64,
    /// Drop a peer silent for this many seconds.
    pub pong_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// MSU liveness window in milliseconds.
    pub msu_ttl_ms: i64,
    /// Interval of the stale-MSU sweep in milliseconds, `0` to disable.
    pub msu_sweep_interval_ms: u64,
}

impl ServerConfig {
    /// Ping interval as a [`Duration`], at least one second.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Pong timeout as a [`Duration`].
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// Sweep interval, `None` when the sweep is disabled.
    pub fn msu_sweep_interval(&self) -> Option<Duration> {
        (self.msu_sweep_interval_ms > 0).then(|| Duration::from_millis(self.msu_sweep_interval_ms))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            subpath: "/pilot/center".into(),
            send_queue: 256,
            ping_interval_secs: 30,
            pong_timeout_secs: 90,
            max_message_size: 2 * 1024 * 1024,
            msu_ttl_ms: 30_000,
            msu_sweep_interval_ms: 0,
        }
    }
}

impl From<&PilotSettings> for ServerConfig {
    fn from(settings: &PilotSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            subpath: server.subpath.clone(),
            send_queue: server.send_queue,
            ping_interval_secs: server.ping_interval_secs,
            pong_timeout_secs: server.pong_timeout_secs,
            max_message_size: server.max_message_size,
            msu_ttl_ms: settings.msu.ttl_ms,
            msu_sweep_interval_ms: settings.msu.sweep_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.subpath, "/pilot/center");
        assert_eq!(cfg.send_queue, 256);
        assert_eq!(cfg.max_message_size, 2 * 1024 * 1024);
        assert!(cfg.msu_sweep_interval().is_none());
    }

    #[test]
    fn from_settings_copies_every_field() {
        let mut settings = PilotSettings::default();
        settings.server.host = "10.1.2.3".into();
        settings.server.port = 9000;
        settings.server.subpath = "/sig".into();
        settings.server.send_queue = 16;
        settings.server.ping_interval_secs = 5;
        settings.server.pong_timeout_secs = 15;
        settings.msu.ttl_ms = 1_000;
        settings.msu.sweep_interval_ms = 250;

        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.host, "10.1.2.3");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.subpath, "/sig");
        assert_eq!(cfg.send_queue, 16);
        assert_eq!(cfg.ping_interval(), Duration::from_secs(5));
        assert_eq!(cfg.pong_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.msu_ttl_ms, 1_000);
        assert_eq!(cfg.msu_sweep_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_ping_interval_is_clamped() {
        let cfg = ServerConfig {
            ping_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.ping_interval(), Duration::from_secs(1));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
