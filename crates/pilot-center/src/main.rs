//! # pilot-center
//!
//! Pilot signaling hub binary. Loads settings, starts the WebSocket server
//! and runs until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pilot_server::{PilotServer, ServerConfig};
use pilot_settings::PilotSettings;
use tracing::{info, warn};

/// Pilot signaling hub.
#[derive(Parser, Debug)]
#[command(name = "pilot-center", about = "Pilot signaling hub")]
struct Cli {
    /// Settings file (default `~/.pilot/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Append logs to this file as well as stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(pilot_settings::settings_path)
    }

    /// Load, override and validate settings.
    fn load_settings(&self) -> Result<PilotSettings> {
        let path = self.settings_path();
        let mut settings = pilot_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut PilotSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(file) = &self.log_file {
            settings.logging.file = Some(file.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;
    pilot_logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    let config = ServerConfig::from(&settings);
    let server = match pilot_server::metrics::install_recorder() {
        Ok(handle) => PilotServer::new(config).with_metrics(handle),
        Err(e) => {
            warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            PilotServer::new(config)
        }
    };

    let addr = server.listen().await.context("Failed to bind server")?;
    info!("pilot center listening on ws://{addr}{}", settings.server.subpath);
    let _ = server.spawn_msu_sweeper();

    shutdown_signal().await.context("Failed to listen for shutdown signals")?;

    info!("shutting down");
    server.stop().await;
    info!("shutdown complete");
    Ok(())
}

/// Resolve on ctrl-c, or on SIGTERM where available.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => info!("received SIGTERM"),
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
