//! Graceful shutdown coordination via `CancellationToken`.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signals the server to stop accepting requests and drain.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve on Ctrl-C or SIGTERM, or when shutdown is initiated
    /// elsewhere, then cancel the token.
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            () = ctrl_c() => info!("received Ctrl-C, shutting down"),
            () = terminate() => info!("received SIGTERM, shutting down"),
            () = self.token.cancelled() => {}
        }
        self.shutdown();
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
            let _ = sig.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_not_shutting_down() {
        assert!(!ShutdownCoordinator::new().is_shutting_down());
    }

    #[test]
    fn shutdown_cancels_token() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn wait_returns_after_programmatic_shutdown() {
        let coord = ShutdownCoordinator::new();
        let waiter = coord.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_signal().await });
        coord.shutdown();
        handle.await.unwrap();
    }
}
