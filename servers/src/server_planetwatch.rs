use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use lib_planetwatch::{FramerConfig, PlanetWatcher, StaticPlanetDirectory};

mod planet_logic;
use planet_logic::{config, downstream, logger, state};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_config();
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    let directory = StaticPlanetDirectory::load(&settings.planets_path)
        .with_context(|| format!("Failed to load planet directory {}", settings.planets_path.display()))?;
    log::info!("Known planets: {}", directory.planet_names().join(", "));

    let watcher = PlanetWatcher::with_framer_config(
        Arc::new(directory),
        FramerConfig {
            max_frame_size: settings.max_frame_size,
        },
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let app_state = state::AppState::new(watcher, shutdown_tx.clone());

    let mut downstream_handle = tokio::spawn(downstream::run(settings.port, app_state, shutdown_tx.subscribe()));

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut downstream_handle => {
            return result.context("Downstream task panicked")?;
        }
    }

    let _ = shutdown_tx.send(());

    match downstream_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("Downstream server error: {:#}", e),
        Err(e) => log::error!("Downstream task failed: {}", e),
    }

    log::info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Ctrl-C received, initiating shutdown.");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
