//! # pilot-settings
//!
//! Layered configuration for the pilot signaling hub.
//!
//! Settings are resolved from three layers, lowest priority first:
//! 1. **Compiled defaults** ([`PilotSettings::default()`])
//! 2. **Settings file** (`~/.pilot/settings.json` unless another path is given),
//!    deep-merged over the defaults
//! 3. **Environment variables** (`PILOT_*`)
//!
//! Call [`PilotSettings::validate`] after any further overrides (such as CLI
//! flags) have been applied.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;
