//! Termination signal handling.

use super::ControlEvent;
use tokio::signal;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Waits for SIGTERM, SIGINT or Ctrl+C.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        let (mut sigterm, mut sigint) = match (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "failed to register signal handlers; falling back to Ctrl+C");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
            () = wait_for_ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl+C. Never resolves when the listener cannot be installed.
async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C"),
        Err(err) => {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Spawns a task that sends [`ControlEvent::Shutdown`] on the first
/// termination signal.
pub fn spawn_signal_listener(events: UnboundedSender<ControlEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        if events.send(ControlEvent::Shutdown).is_err() {
            warn!("control loop already gone at shutdown");
        }
    })
}
