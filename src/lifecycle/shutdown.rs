//! Shutdown signal handling
//!
//! Turns OS termination signals into cancellation of the running
//! application.

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Create a future that completes when a shutdown signal is received
///
/// Listens for Ctrl+C everywhere and SIGTERM on unix. If a handler cannot
/// be installed the failure is logged and that source never fires.
///
/// # Example
///
/// ```rust,ignore
/// use conductor::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = server.serve() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

/// Cancel `token` when a shutdown signal arrives.
///
/// Returns without acting once `token` is cancelled by anyone else.
pub(crate) async fn listen(token: CancellationToken) {
    tokio::select! {
        _ = shutdown_signal() => {
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}
