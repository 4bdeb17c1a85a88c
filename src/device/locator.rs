//! Gamepad discovery.
//!
//! Probes `eventN` nodes in a fixed range and claims the first one that looks
//! like a gamepad: two full analog sticks plus the south face button. Every
//! other node is closed again right away. A scan never blocks and never
//! retries; waiting for hardware is the hotplug watcher's job.

use super::source::{EvdevSource, EventSource};
use evdev::raw_stream::RawDevice;
use evdev::{AbsoluteAxisCode, KeyCode};
use nix::fcntl::OFlag;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Axes a device must report to drive both the pointer and the wheel.
const REQUIRED_AXES: [AbsoluteAxisCode; 4] = [
    AbsoluteAxisCode::ABS_X,
    AbsoluteAxisCode::ABS_Y,
    AbsoluteAxisCode::ABS_RX,
    AbsoluteAxisCode::ABS_RY,
];

/// Reference button telling gamepads apart from other absolute-axis devices.
const REFERENCE_BUTTON: KeyCode = KeyCode::BTN_SOUTH;

/// Declared event codes of one device node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    absolute_axes: BTreeSet<u16>,
    keys: BTreeSet<u16>,
}

impl Capabilities {
    /// Capabilities made of the given axis and key codes.
    pub fn new(
        absolute_axes: impl IntoIterator<Item = AbsoluteAxisCode>,
        keys: impl IntoIterator<Item = KeyCode>,
    ) -> Self {
        Self {
            absolute_axes: absolute_axes.into_iter().map(|axis| axis.0).collect(),
            keys: keys.into_iter().map(|key| key.code()).collect(),
        }
    }

    /// Capabilities as reported by the kernel for `device`.
    pub fn of(device: &RawDevice) -> Self {
        Self::new(
            device
                .supported_absolute_axes()
                .map(|axes| axes.iter().collect::<Vec<_>>())
                .unwrap_or_default(),
            device
                .supported_keys()
                .map(|keys| keys.iter().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// A full gamepad: both sticks and the reference button.
    pub fn is_gamepad(&self) -> bool {
        REQUIRED_AXES
            .iter()
            .all(|axis| self.absolute_axes.contains(&axis.0))
            && self.keys.contains(&REFERENCE_BUTTON.code())
    }
}

/// An opened, not yet claimed device node. Dropping it closes the node.
pub trait Candidate {
    fn name(&self) -> &str;

    /// What the node declared when it was opened.
    fn capabilities(&self) -> &Capabilities;

    /// Claims the node as the session's event source.
    fn into_source(self: Box<Self>) -> io::Result<Box<dyn EventSource>>;
}

/// The set of enumerable device nodes.
pub trait DeviceNamespace {
    /// Opens node `index`.
    fn open(&self, index: u32) -> io::Result<Box<dyn Candidate>>;
}

/// `eventN` nodes below a directory, opened with evdev.
///
/// Nodes are opened read-only and non-blocking, so probing a device never
/// stalls the scan and never needs write access to it.
pub struct EvdevNamespace {
    dir: PathBuf,
}

/// Opens one device node for reading without blocking.
fn open_node(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
}

impl EvdevNamespace {
    /// Namespace over the `eventN` nodes in `dir`, usually `/dev/input`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeviceNamespace for EvdevNamespace {
    fn open(&self, index: u32) -> io::Result<Box<dyn Candidate>> {
        let path = self.dir.join(format!("event{index}"));
        let device = RawDevice::from_fd(OwnedFd::from(open_node(&path)?))?;
        let capabilities = Capabilities::of(&device);
        let name = device.name().unwrap_or("unnamed device").to_string();

        Ok(Box::new(EvdevCandidate {
            path,
            name,
            capabilities,
            device,
        }))
    }
}

struct EvdevCandidate {
    path: PathBuf,
    name: String,
    capabilities: Capabilities,
    device: RawDevice,
}

impl Candidate for EvdevCandidate {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn into_source(self: Box<Self>) -> io::Result<Box<dyn EventSource>> {
        debug!("Claiming {}", self.path.display());
        Ok(Box::new(EvdevSource::new(self.device)?))
    }
}

/// The SEARCHING phase: one bounded pass over a [`DeviceNamespace`].
pub struct DeviceLocator {
    namespace: Box<dyn DeviceNamespace>,
    scan_limit: u32,
}

impl DeviceLocator {
    /// Scans nodes `0..scan_limit` of `namespace` on every [`locate`](Self::locate).
    pub fn new(namespace: Box<dyn DeviceNamespace>, scan_limit: u32) -> Self {
        Self {
            namespace,
            scan_limit,
        }
    }

    /// Returns the first qualifying gamepad, if any.
    pub fn locate(&self) -> Option<Box<dyn EventSource>> {
        for index in 0..self.scan_limit {
            let candidate = match self.namespace.open(index) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!("Skipping event{}: {}", index, e);
                    continue;
                }
            };

            if !candidate.capabilities().is_gamepad() {
                debug!("Skipping event{} ({}): not a gamepad", index, candidate.name());
                continue;
            }

            let name = candidate.name().to_string();
            match candidate.into_source() {
                Ok(source) => {
                    info!("Gamepad found: {} (event{})", name, index);
                    return Some(source);
                }
                Err(e) => warn!("Failed to claim gamepad {} (event{}): {}", name, index, e),
            }
        }

        debug!("No gamepad among event0..event{}", self.scan_limit);
        None
    }
}
