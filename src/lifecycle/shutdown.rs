//! Shutdown coordination for bodyrest servers.

use tokio::sync::broadcast;

/// What ended a server's wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// Ctrl+C reached the process.
    Interrupt,
    /// `Shutdown::trigger` was called.
    Triggered,
    /// The coordinator was dropped without triggering.
    Abandoned,
}

/// Fans one stop request out to every running `HttpServer`.
///
/// Each server holds a receiver from `subscribe`; the receiver count is the
/// number of servers that have not yet stopped.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to hand to `HttpServer::run`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscribed server to stop. Returns how many were notified.
    pub fn trigger(&self) -> usize {
        match self.tx.send(()) {
            Ok(notified) => {
                tracing::info!(servers = notified, "Shutdown requested");
                notified
            }
            Err(_) => {
                tracing::debug!("Shutdown requested with no running servers");
                0
            }
        }
    }

    /// Servers still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once the server holding `receiver` should stop draining
/// connections.
pub async fn wait_for_shutdown(receiver: broadcast::Receiver<()>) -> ShutdownCause {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let cause = tokio::select! {
        _ = ctrl_c => ShutdownCause::Interrupt,
        cause = broadcast_cause(receiver) => cause,
    };
    tracing::info!(cause = ?cause, "Shutdown signal received");
    cause
}

async fn broadcast_cause(mut receiver: broadcast::Receiver<()>) -> ShutdownCause {
    match receiver.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => ShutdownCause::Triggered,
        Err(broadcast::error::RecvError::Closed) => ShutdownCause::Abandoned,
    }
}
