//! OS signal handling for the demo binary: both SIGINT and SIGTERM trigger
//! graceful shutdown.

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// Resolves on the first of SIGINT or SIGTERM.
pub async fn wait_for_shutdown() {
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
    }
}
