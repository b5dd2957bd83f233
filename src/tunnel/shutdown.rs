//! Termination signal handling.
//!
//! The signal listener never touches tunnel state. It cancels a
//! [`CancellationToken`], and the supervisory loop that owns the registry
//! reacts to it.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Delivers a single shutdown request to whoever awaits it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator with no signal listener attached. Shutdown only happens
    /// through [`ShutdownCoordinator::request`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for Ctrl+C, and SIGTERM on unix, in a background task.
    ///
    /// Installing the listener consumes the signal, so the process is not
    /// killed and teardown can run. Must be called inside a tokio runtime.
    pub fn install() -> Self {
        let coordinator = Self::new();
        let token = coordinator.token.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                use tokio::signal::unix::{SignalKind, signal};

                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, initiating shutdown");
                }
                _ = terminate => {
                    info!("Received SIGTERM, initiating shutdown");
                }
            }

            token.cancel();
        });

        coordinator
    }

    /// Ask for shutdown. Repeated requests are ignored.
    pub fn request(&self) {
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once shutdown has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
