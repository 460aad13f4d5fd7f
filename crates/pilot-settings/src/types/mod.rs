//! Settings type definitions.
//!
//! Every type uses camelCase JSON keys and `#[serde(default)]`, so a partial
//! settings file only needs the fields it changes.

mod logging;
mod msu;
mod server;

pub use logging::*;
pub use msu::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// HTTP routes the WebSocket subpath may not take over.
const RESERVED_PATHS: &[&str] = &["/health", "/metrics"];

/// Root settings for the hub.
///
/// ```json
/// {
///   "server": { "port": 8443, "subpath": "/signal" },
///   "msu": { "ttlMs": 60000, "sweepIntervalMs": 10000 },
///   "logging": { "level": "debug", "json": true }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PilotSettings {
    /// Listener and per-connection settings.
    pub server: ServerSettings,
    /// MSU liveness settings.
    pub msu: MsuSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl PilotSettings {
    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "server.host must not be empty".into(),
            ));
        }
        if server.send_queue == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueue must be at least 1".into(),
            ));
        }
        if server.pong_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "server.pongTimeoutSecs must be at least 1".into(),
            ));
        }
        if !server.subpath.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "server.subpath must start with '/': {}",
                server.subpath
            )));
        }
        if !is_literal_path(&server.subpath) {
            return Err(SettingsError::InvalidValue(format!(
                "server.subpath must be a plain path of letters, digits, '-', '.', '_' or '~': {}",
                server.subpath
            )));
        }
        if RESERVED_PATHS.contains(&server.subpath.as_str()) {
            return Err(SettingsError::InvalidValue(format!(
                "server.subpath collides with {}",
                server.subpath
            )));
        }
        if self.msu.ttl_ms <= 0 {
            return Err(SettingsError::InvalidValue(
                "msu.ttlMs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// `/` or `/seg/seg...` with non-empty segments and no route syntax.
fn is_literal_path(path: &str) -> bool {
    path == "/"
        || path.split('/').skip(1).all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults() {
        let s = PilotSettings::default();
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.port, 4443);
        assert_eq!(s.server.subpath, "/pilot/center");
        assert_eq!(s.server.send_queue, 256);
        assert_eq!(s.server.ping_interval_secs, 30);
        assert_eq!(s.server.pong_timeout_secs, 90);
        assert_eq!(s.server.max_message_size, 2 * 1024 * 1024);
        assert_eq!(s.msu.ttl_ms, 30_000);
        assert_eq!(s.msu.sweep_interval_ms, 0);
        assert_eq!(s.logging.level, "info");
        assert!(!s.logging.json);
        assert!(s.logging.file.is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn camel_case_round_trip() {
        let value = serde_json::to_value(PilotSettings::default()).unwrap();
        assert_eq!(value["server"]["sendQueue"], 256);
        assert_eq!(value["server"]["pingIntervalSecs"], 30);
        assert_eq!(value["msu"]["sweepIntervalMs"], 0);
        assert!(value["logging"].get("file").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: PilotSettings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.msu.ttl_ms, 30_000);
    }

    #[test]
    fn port_zero_is_valid() {
        let mut s = PilotSettings::default();
        s.server.port = 0;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn empty_host_rejected() {
        let mut s = PilotSettings::default();
        s.server.host = "  ".into();
        assert_matches!(
            s.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("host")
        );
    }

    #[test]
    fn zero_send_queue_rejected() {
        let mut s = PilotSettings::default();
        s.server.send_queue = 0;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn subpath_must_be_absolute() {
        let mut s = PilotSettings::default();
        s.server.subpath = "pilot".into();
        assert_matches!(
            s.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("subpath")
        );
    }

    #[test]
    fn subpath_rejects_route_syntax() {
        for bad in ["/:room", "/pilot/{id}", "/pilot/*rest", "//pilot", "/pilot/", "/pi lot"] {
            let mut s = PilotSettings::default();
            s.server.subpath = bad.into();
            assert_matches!(
                s.validate(),
                Err(SettingsError::InvalidValue(msg)) if msg.contains("plain path"),
                "{bad}"
            );
        }
    }

    #[test]
    fn subpath_accepts_plain_paths() {
        for good in ["/", "/signal", "/pilot/center", "/v1.2/ws_hub-~"] {
            let mut s = PilotSettings::default();
            s.server.subpath = good.into();
            assert!(s.validate().is_ok(), "{good}");
        }
    }

    #[test]
    fn zero_pong_timeout_rejected() {
        let mut s = PilotSettings::default();
        s.server.pong_timeout_secs = 0;
        assert_matches!(
            s.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("pongTimeoutSecs")
        );
    }

    #[test]
    fn subpath_cannot_shadow_health() {
        let mut s = PilotSettings::default();
        s.server.subpath = "/health".into();
        assert_matches!(
            s.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("/health")
        );
    }

    #[test]
    fn subpath_cannot_shadow_metrics() {
        let mut s = PilotSettings::default();
        s.server.subpath = "/metrics".into();
        assert_matches!(
            s.validate(),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("/metrics")
        );
    }

    #[test]
    fn non_positive_ttl_rejected() {
        let mut s = PilotSettings::default();
        s.msu.ttl_ms = 0;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }
}
