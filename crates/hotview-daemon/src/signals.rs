//! Process signals that end the watch daemon.

use std::fmt;

/// Signal that asked the daemon to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM, e.g. from a service manager
    Terminate,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shutdown::Interrupt => f.write_str("SIGINT"),
            Shutdown::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolve with the first shutdown signal the process receives.
///
/// A signal that cannot be registered is logged and never fires; the
/// other one still ends the wait.
pub async fn shutdown_signal() -> Shutdown {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => Shutdown::Interrupt,
        _ = terminate() => Shutdown::Terminate,
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
