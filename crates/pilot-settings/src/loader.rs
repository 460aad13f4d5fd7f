//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per key)
//! - Arrays and scalars are replaced by the source
//! - Null values in the source are skipped

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::PilotSettings;

/// Default settings file location (`~/.pilot/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".pilot").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PilotSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. A file that exists but is not valid JSON
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PilotSettings> {
    let defaults = serde_json::to_value(PilotSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PilotSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursively merge `source` into `target`.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PILOT_*` environment overrides. Invalid values are logged and
/// ignored.
pub fn apply_env_overrides(settings: &mut PilotSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("PILOT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("PILOT_PORT", 0, u16::MAX) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("PILOT_SUBPATH") {
        settings.server.subpath = v;
    }

    // ── MSU ─────────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("PILOT_MSU_TTL_MS", 1, 86_400_000) {
        settings.msu.ttl_ms = i64::try_from(v).unwrap_or(i64::MAX);
    }
    if let Some(v) = read_env_u64("PILOT_MSU_SWEEP_MS", 0, 86_400_000) {
        settings.msu.sweep_interval_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("PILOT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("PILOT_LOG_JSON") {
        settings.logging.json = v;
    }
    if let Some(v) = read_env_string("PILOT_LOG_FILE") {
        settings.logging.file = Some(PathBuf::from(v));
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a boolean. Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`,
/// case-insensitively.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u16` within `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a `u64` within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}
