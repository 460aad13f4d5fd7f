//! # pilot-logging
//!
//! Installs the global `tracing` subscriber: an [`EnvFilter`] (`RUST_LOG`
//! wins over the configured level), a stdout layer in plain or JSON form,
//! and an optional append-only log file.

#![deny(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use pilot_settings::LoggingSettings;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// The log file could not be opened.
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `settings`. Call once.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let filter = build_filter(&settings.level)?;

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(if settings.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    });

    if let Some(path) = &settings.file {
        let file = Arc::new(open_log_file(path)?);
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(file)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;
    Ok(())
}

/// `RUST_LOG` if set and valid, otherwise `level`.
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

/// Open `path` for appending, creating it and its parent directories.
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/pilot.log");
        let _file = open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pilot.log");
        {
            let mut f = open_log_file(&path).unwrap();
            f.write_all(b"one\n").unwrap();
        }
        {
            let mut f = open_log_file(&path).unwrap();
            f.write_all(b"two\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn open_bare_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.log");
        assert!(open_log_file(&path).is_ok());
    }

    #[test]
    fn open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        assert_matches!(
            open_log_file(&blocker.join("pilot.log")),
            Err(LoggingError::Io(_))
        );
    }

    #[test]
    fn filter_accepts_directives() {
        assert!(EnvFilter::try_new("debug,pilot_server=trace").is_ok());
        assert!(build_filter("info").is_ok());
    }

    #[test]
    fn invalid_level_is_rejected() {
        let err = EnvFilter::try_new("pilot=loud").map(|_| ()).map_err(LoggingError::from);
        assert_matches!(err, Err(LoggingError::Filter(_)));
    }
}
