use tracing::{info, warn};

/// Resolves on SIGTERM or SIGINT so the server can drain in-flight requests.
pub async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Unable to register shutdown handler ({e}), falling back to Ctrl-C");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl-C handler failed: {e}");
            }
            return;
        }
    };
    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT"
    };
    // Not visible in some docker-compose setups, which swallow output on stop.
    info!("Received signal ({signal}) - shutting down gracefully.");
}
