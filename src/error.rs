//! Daemon-level error types.
//!
//! Everything here is fatal: recoverable churn (no gamepad present, gamepad
//! unplugged) is modelled as state transitions, not errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A failure that ends the process.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The virtual pointer device could not be registered with uinput.
    #[error("failed to create virtual device: {0}")]
    OutputSinkError(#[source] io::Error),

    /// The device directory could not be watched for new nodes.
    #[error("failed to monitor {}: {source}", path.display())]
    HotplugError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SIGINT/SIGTERM could not be routed into the event loop.
    #[error("failed to install signal handler: {0}")]
    SignalError(#[source] io::Error),

    /// Reading from the gamepad failed for a reason other than removal.
    #[error("failed to read event from {device}: {source}")]
    DeviceReadError {
        device: String,
        #[source]
        source: io::Error,
    },

    /// Draining the hotplug notification queue failed.
    #[error("failed to read hotplug notifications: {0}")]
    NotificationError(#[source] io::Error),

    /// Writing a batch to the virtual device failed.
    #[error("failed to write to virtual device: {0}")]
    EmitError(#[source] io::Error),
}
