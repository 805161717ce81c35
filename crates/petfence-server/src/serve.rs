//! HTTP(S) serving and shutdown signalling.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::settings::ServerSettings;

/// Spawn a task that flips the returned receiver to `true` on SIGINT or SIGTERM.
pub fn setup_signal_handlers() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = tx.send(true);
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(mut sigint), Ok(mut sigterm)) => {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }
        _ => {
            warn!("Could not install Unix signal handlers, falling back to Ctrl+C");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => {
            warn!(error = %e, "Ctrl+C handler unavailable, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Resolve once `shutdown` reads `true` or its sender is gone.
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Serve `router` until shutdown is signalled.
///
/// HTTPS is used when `settings.https` is set and the `https` feature is
/// compiled in; otherwise plain HTTP.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    router: Router,
    settings: ServerSettings,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    if settings.https {
        #[cfg(feature = "https")]
        return serve_https(router, settings.bind_addr, shutdown).await;

        #[cfg(not(feature = "https"))]
        warn!("HTTPS requested but this build lacks the `https` feature, serving plain HTTP");
    }

    serve_http(router, settings.bind_addr, shutdown).await
}

async fn serve_http(
    router: Router,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Serve over TLS with a self-signed certificate for `localhost`.
#[cfg(feature = "https")]
async fn serve_https(
    router: Router,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use std::time::Duration;

    use axum_server::tls_rustls::RustlsConfig;

    // Several providers may be linked in; pick one explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .context("Failed to generate self-signed certificate")?;
    let tls = RustlsConfig::from_pem(
        cert.pem().into_bytes(),
        key_pair.serialize_pem().into_bytes(),
    )
    .await
    .context("Invalid TLS material")?;

    let handle = axum_server::Handle::new();
    let stopper = handle.clone();
    tokio::spawn(async move {
        wait_for_shutdown(shutdown).await;
        stopper.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    warn!("Serving HTTPS with a self-signed certificate, for development only");
    info!(%addr, "Listening on https://{addr}");

    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .context("HTTPS server failed")?;

    info!("HTTPS server stopped");
    Ok(())
}
