//! # petfence-server
//!
//! Runs the collar monitor and exposes its status over HTTP.
//!
//! ## Running
//!
//! ```bash
//! # On the receiver, with BlueZ
//! cargo build --release --package petfence-server
//! PETFENCE_PRODUCTION=true ./petfence-server
//!
//! # Development, without a Bluetooth adapter
//! cargo run --package petfence-server --no-default-features
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::sync::Arc;

use anyhow::Context;
use petfence_core::{
    ConfigStore, DeviceScanner, Monitor, PetStatus, ScanBackend, ScanResult, SharedConfig,
    SharedScan, SharedStatus, StatusReporter,
};
use petfence_server::settings::ServerSettings;
use petfence_server::state::AppState;
use petfence_server::{api, logging, serve};
use tokio::sync::{watch, RwLock};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::from_env().context("Invalid PETFENCE_* settings")?;
    logging::init(&settings)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting petfence-server");

    let store = ConfigStore::new(&settings.config_path);
    let config = store.load_or_default();
    info!(
        path = %store.path().display(),
        device = ?config.device_target().map(|t| t.to_string()),
        radius_m = config.perimeter_radius_m,
        interval_secs = config.scan_interval_secs,
        forwarding = config.status_url().is_some(),
        "Configuration loaded"
    );

    let shared_config: SharedConfig = Arc::new(RwLock::new(config));
    let status = SharedStatus::new(PetStatus::default());
    let last_scan = SharedScan::new(ScanResult::default());

    let state = AppState::new(
        Arc::clone(&shared_config),
        store,
        status.clone(),
        last_scan.clone(),
    );

    let shutdown = serve::setup_signal_handlers();
    let mut server = tokio::spawn(serve::serve(
        api::create_router(state),
        settings.clone(),
        shutdown.clone(),
    ));

    let parts = MonitorParts {
        config: shared_config,
        status,
        last_scan,
        reporter: StatusReporter::new()?,
        settings: &settings,
    };

    tokio::select! {
        () = run_monitor(parts, shutdown) => {}
        joined = &mut server => {
            // The server only returns early if it could not start or crashed.
            return joined.context("HTTP server task panicked")?;
        }
    }

    server.await.context("HTTP server task panicked")??;
    info!("petfence-server stopped");
    Ok(())
}

struct MonitorParts<'a> {
    config: SharedConfig,
    status: SharedStatus,
    last_scan: SharedScan,
    reporter: StatusReporter,
    settings: &'a ServerSettings,
}

#[cfg(feature = "bluetooth")]
async fn run_monitor(parts: MonitorParts<'_>, shutdown: watch::Receiver<bool>) {
    match petfence_core::BluezBackend::new().await {
        Ok(backend) => monitor_with(backend, parts, shutdown).await,
        Err(e) => {
            tracing::error!(error = %e, "Bluetooth unavailable, every scan will report the collar as not detected");
            monitor_with(petfence_core::UnavailableBackend, parts, shutdown).await;
        }
    }
}

#[cfg(not(feature = "bluetooth"))]
async fn run_monitor(parts: MonitorParts<'_>, shutdown: watch::Receiver<bool>) {
    tracing::warn!("Built without the `bluetooth` feature, the collar will never be detected");
    monitor_with(petfence_core::UnavailableBackend, parts, shutdown).await;
}

async fn monitor_with<B: ScanBackend>(
    backend: B,
    parts: MonitorParts<'_>,
    shutdown: watch::Receiver<bool>,
) {
    let scanner =
        DeviceScanner::new(backend, parts.last_scan).with_window(parts.settings.scan_window());
    Monitor::new(parts.config, scanner, parts.reporter, parts.status)
        .run(serve::wait_for_shutdown(shutdown))
        .await;
}
