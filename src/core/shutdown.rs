use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Waits for Ctrl+C or SIGTERM and cancels `token`.
///
/// Returns early without touching the signal handlers if the token is
/// cancelled by someone else first.
pub(crate) async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, stopping listeners"),
        _ = terminate => tracing::info!("SIGTERM received, stopping listeners"),
        _ = token.cancelled() => return,
    }

    token.cancel();
}
