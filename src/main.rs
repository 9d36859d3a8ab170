//! Relink demo driver.
//!
//! Loads a configuration, builds a connection manager from it and drives a
//! simulated flaky link through the reconnect scheduler until the retry
//! policy gives up, the configured run time elapses, or Ctrl+C.

mod sim;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use relink::config::{env::get_config_path, load_and_validate, Config};
use relink::ConnectionManager;

use sim::SimExit;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Relink v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    let config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {}...", config_path);
        load_and_validate(&config_path).map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?
    } else {
        warn!("{} not found, using built-in defaults", config_path);
        let config = relink::config::env::apply_env_overrides(Config::default());
        relink::config::validate_config(&config)?;
        config
    };

    info!("Configuration loaded successfully");
    info!("  Policy: {}", config.reconnect.policy.kind);
    info!("  Tick interval: {}ms", config.reconnect.tick_interval_ms);
    info!("  Link: {}", config.simulation.name);

    let manager = Arc::new(ConnectionManager::from_config(&config.reconnect)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sim_task = {
        let config = config.clone();
        let manager = manager.clone();
        tokio::spawn(async move { sim::run(&config, manager, shutdown_rx).await })
    };

    let finished = tokio::select! {
        biased;
        _ = shutdown_signal() => None,
        result = &mut sim_task => Some(result),
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Shutdown signal received - stopping simulation...");
            if let Err(e) = shutdown_tx.send(true) {
                debug!("Shutdown channel closed (simulation already exited): {}", e);
            }
            sim_task.await
        }
    };

    let (exit, summary) = result?;
    match exit {
        SimExit::GaveUp => warn!("Retry policy gave up"),
        SimExit::TimeUp => info!("Run time elapsed"),
        SimExit::Shutdown => info!("Simulation stopped"),
    }
    info!(
        "{} episodes, {} attempts, {} successful connects",
        summary.episodes, summary.attempts, summary.connects
    );
    if manager.keep_alive().is_held() {
        warn!(
            "Keep-alive still held by {} episode(s)",
            manager.keep_alive().outstanding()
        );
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
