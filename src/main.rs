mod config;
mod listener;
mod platform;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::listener::Listener;
use crate::platform::dbus::DbusSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only messages
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,signal_listener=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::default(),
    };

    info!("  Bus: {}", config.dbus.bus);
    info!("  Service: {}", config.dbus.service);
    info!("  Attachments: {:?}", config.output.attachments);

    let service = DbusSignal::connect(&config.dbus).await?;
    let mut listener = Listener::new(service, std::io::stdout(), config.output.attachments);

    tokio::select! {
        result = listener.run() => result,
        signal = tokio::signal::ctrl_c() => on_interrupt(signal),
    }
}

/// Ctrl-C ends the process cleanly; failing to watch for it is a fault.
fn on_interrupt(signal: std::io::Result<()>) -> Result<()> {
    signal.context("Failed to listen for Ctrl-C")?;
    info!("Interrupted, shutting down");
    Ok(())
}
