//! Sleeping until a new device node shows up.
//!
//! While no gamepad is present the daemon waits on IN_CREATE notifications
//! for the device directory instead of rescanning on a timer. Notification
//! contents are never inspected: any new node means "scan again".

use crate::error::DaemonError;
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use std::io;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::path::Path;
use tokio::io::unix::AsyncFd;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a hotplug wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugOutcome {
    /// Something was created in the device directory.
    Retry,
    /// Termination was requested while waiting.
    Terminated,
}

/// A queue of file-creation notifications.
#[async_trait]
pub trait HotplugSource: Send {
    /// Waits until at least one notification is queued, drains the queue and
    /// returns the number of records discarded. Must be cancel safe.
    async fn wait_for_creation(&mut self) -> io::Result<usize>;
}

/// Owns the inotify descriptor; the raw fd it reports never changes.
struct InotifyFd(Inotify);

impl AsRawFd for InotifyFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_fd().as_raw_fd()
    }
}

/// Non-blocking inotify instance registered with the tokio reactor.
pub struct InotifyWatch {
    fd: AsyncFd<InotifyFd>,
}

impl InotifyWatch {
    /// Starts watching `dir` for newly created entries.
    pub fn watch(dir: &Path) -> io::Result<Self> {
        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)?;
        inotify.add_watch(dir, AddWatchFlags::IN_CREATE)?;
        debug!("Watching {} for new devices", dir.display());

        // SAFETY: `InotifyFd` owns the descriptor and closes it only when the
        // `AsyncFd` holding it is dropped.
        let fd = unsafe { AsyncFd::register(InotifyFd(inotify)) }?;
        Ok(Self { fd })
    }
}

/// Reads until the queue is empty. Reports `WouldBlock` if nothing was
/// queued at all, so the reactor readiness gets cleared.
fn drain(inotify: &Inotify) -> io::Result<usize> {
    let mut drained = 0;
    loop {
        match inotify.read_events() {
            Ok(events) if events.is_empty() => break,
            Ok(events) => drained += events.len(),
            Err(Errno::EAGAIN) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if drained == 0 {
        Err(io::ErrorKind::WouldBlock.into())
    } else {
        Ok(drained)
    }
}

#[async_trait]
impl HotplugSource for InotifyWatch {
    async fn wait_for_creation(&mut self) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| drain(&inner.get_ref().0)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

/// The WAIT_HOTPLUG phase.
pub struct HotplugWatcher {
    source: Box<dyn HotplugSource>,
}

impl HotplugWatcher {
    /// Watcher over any notification queue; tests script one.
    pub fn new(source: Box<dyn HotplugSource>) -> Self {
        Self { source }
    }

    /// Blocks until a device node is created or `shutdown` fires.
    pub async fn wait(&mut self, shutdown: &CancellationToken) -> Result<HotplugOutcome, DaemonError> {
        info!("Waiting for a gamepad to be plugged in");

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("Termination requested while waiting for hotplug");
                Ok(HotplugOutcome::Terminated)
            }
            drained = self.source.wait_for_creation() => {
                let drained = drained.map_err(DaemonError::NotificationError)?;
                info!("Device directory changed, rescanning");
                debug!("Drained {} notification(s)", drained);
                Ok(HotplugOutcome::Retry)
            }
        }
    }
}
