//! SIGINT/SIGTERM → cancellation.
//!
//! Handlers are registered up front so a failure is a startup error, then a
//! background task cancels the returned token on the first signal. The token
//! stays cancelled, so a wait that starts after the signal still sees it.

use crate::error::DaemonError;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Registers SIGINT and SIGTERM and returns the token they cancel.
///
/// Must be called inside the runtime.
pub fn install() -> Result<CancellationToken, DaemonError> {
    let interrupt = signal(SignalKind::interrupt()).map_err(DaemonError::SignalError)?;
    let terminate = signal(SignalKind::terminate()).map_err(DaemonError::SignalError)?;

    let token = CancellationToken::new();
    tokio::spawn(listen(interrupt, terminate, token.clone()));
    Ok(token)
}

async fn listen(mut interrupt: Signal, mut terminate: Signal, token: CancellationToken) {
    tokio::select! {
        _ = interrupt.recv() => info!("Received SIGINT"),
        _ = terminate.recv() => info!("Received SIGTERM"),
        _ = token.cancelled() => return,
    }
    info!("Exiting");
    token.cancel();
}
