//! Shutdown plumbing shared by the server's various triggers: Ctrl+C,
//! SIGTERM, and the `shutdown` operator command read from stdin.
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builds a [`CancellationToken`] that fires when the process receives
/// `SIGINT` (Ctrl+C) or, on Unix, `SIGTERM`. The `shutdown` stdin command
/// (see `server::watch_stdin`) cancels the same token directly.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let tc = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut term =
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = signal::ctrl_c() => info!("received Ctrl+C"),
                _ = term.recv() => info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            signal::ctrl_c()
                .await
                .expect("failed to install ctrl+C handler");
            info!("received Ctrl+C");
        }
        tc.cancel();
    });
    token
}
