//! Top-level lifecycle of the daemon.
//!
//! # Phases
//!
//! ```text
//!             ┌──────── Retry ─────────┐
//!             ▼                        │
//!   ──► Searching ── none ──► WaitHotplug ── signal ──► Terminated
//!          │  ▲                                           ▲
//!        found│                                           │
//!          ▼  │                                           │
//!        Active ── ENODEV ──► Disconnected                │
//!          │                                              │
//!          └──────────────── signal ──────────────────────┘
//! ```
//!
//! `Daemon<Running>` owns the virtual device for its entire life; sessions
//! only borrow it. Reaching `Terminated` hands back a `Daemon<Stopped>`,
//! whose [`shutdown`](Daemon::shutdown) releases the device.

use crate::device::{DeviceLocator, EventSource, HotplugOutcome, HotplugWatcher, OutputSink};
use crate::error::DaemonError;
use crate::session::{SessionOutcome, SessionSettings, TranslationSession};
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[state]
#[derive(Debug, Clone)]
pub enum DaemonState {
    Running,
    Stopped,
}

/// The daemon and everything that outlives a single gamepad.
#[machine]
pub struct Daemon<S: DaemonState> {
    locator: DeviceLocator,
    hotplug: HotplugWatcher,
    sink: Box<dyn OutputSink>,
    settings: SessionSettings,
    shutdown: CancellationToken,
}

enum Phase {
    Searching,
    Active(Box<dyn EventSource>),
    Disconnected,
    WaitHotplug,
    Terminated,
}

impl Daemon<Running> {
    /// Assembles a daemon from already created collaborators. Nothing is
    /// opened until [`run`](Self::run).
    pub fn create(
        locator: DeviceLocator,
        hotplug: HotplugWatcher,
        sink: Box<dyn OutputSink>,
        settings: SessionSettings,
        shutdown: CancellationToken,
    ) -> Self {
        debug!("Creating daemon with settings: {:?}", settings);
        Self::new(locator, hotplug, sink, settings, shutdown)
    }

    /// Drives the phase loop until termination is requested.
    ///
    /// Only fatal errors escape; a missing or vanished gamepad just moves the
    /// loop to the next phase.
    pub async fn run(mut self) -> Result<Daemon<Stopped>, DaemonError> {
        let mut phase = Phase::Searching;

        loop {
            phase = match phase {
                Phase::Searching if self.shutdown.is_cancelled() => Phase::Terminated,
                Phase::Searching => match self.locator.locate() {
                    Some(source) => Phase::Active(source),
                    None => Phase::WaitHotplug,
                },
                Phase::Active(source) => {
                    let session =
                        TranslationSession::new(source, &mut *self.sink, &self.settings);
                    match session.run(&self.shutdown).await? {
                        SessionOutcome::Disconnected => Phase::Disconnected,
                        SessionOutcome::Terminated => Phase::Terminated,
                    }
                }
                Phase::Disconnected => {
                    debug!("Gamepad released, searching again");
                    Phase::Searching
                }
                Phase::WaitHotplug => match self.hotplug.wait(&self.shutdown).await? {
                    HotplugOutcome::Retry => Phase::Searching,
                    HotplugOutcome::Terminated => Phase::Terminated,
                },
                Phase::Terminated => break,
            };
        }

        info!("Stopping daemon");
        Ok(self.transition())
    }
}

impl Daemon<Stopped> {
    /// Releases the virtual device. Consuming `self` makes this happen once.
    pub fn shutdown(self) {
        debug!("Releasing output device");
        drop(self);
        info!("Daemon stopped");
    }
}
