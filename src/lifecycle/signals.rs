//! OS signal handling.
//!
//! SIGTERM and SIGINT both start the drain. The server itself never listens
//! for signals; the binary bridges them to a [`Shutdown`](super::Shutdown),
//! which keeps drain behavior testable without real signals.

use std::io;

/// Wait for a termination signal and return its name.
#[cfg(unix)]
pub async fn terminate() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = term.recv() => Ok("SIGTERM"),
        _ = int.recv() => Ok("SIGINT"),
    }
}

/// Wait for a termination signal and return its name.
#[cfg(not(unix))]
pub async fn terminate() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
