use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Cancels `cancel` on the first Ctrl+C; a second one exits immediately.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for Ctrl+C");
            return;
        }
        warn!("Ctrl+C received, finishing in-flight work (press again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second Ctrl+C received, aborting");
            std::process::exit(130);
        }
    });
}
