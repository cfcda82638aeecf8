//! Process signal handling for graceful shutdown.

use tokio::signal;
use tracing::{error, warn};

/// Resolve once Ctrl+C or SIGTERM is received.
///
/// A handler that cannot be installed is logged and never fires, so the
/// other signal still stops the server.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, draining connections"),
        _ = terminate => warn!("Received SIGTERM, draining connections"),
    }
}
