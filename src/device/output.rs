//! The virtual pointer/keyboard every session writes to.
//!
//! Created once at startup and kept for the whole process lifetime, so
//! compositors and other consumers bind to it once and never see it vanish
//! across gamepad hotplug cycles.

use crate::translate::ButtonRouter;
use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, InputEvent, KeyCode, RelativeAxisCode};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Relative axes registered on the virtual device.
pub const OUTPUT_AXES: [RelativeAxisCode; 4] = [
    RelativeAxisCode::REL_X,
    RelativeAxisCode::REL_Y,
    RelativeAxisCode::REL_WHEEL_HI_RES,
    RelativeAxisCode::REL_HWHEEL_HI_RES,
];

/// Keys registered on the virtual device beyond the button routes: trigger
/// modifiers and hat arrows.
const EXTRA_KEYS: [KeyCode; 6] = [
    KeyCode::KEY_LEFTCTRL,
    KeyCode::KEY_LEFTSHIFT,
    KeyCode::KEY_LEFT,
    KeyCode::KEY_RIGHT,
    KeyCode::KEY_UP,
    KeyCode::KEY_DOWN,
];

/// Every key the translation layer may emit.
pub fn output_keys() -> AttributeSet<KeyCode> {
    let mut keys = AttributeSet::<KeyCode>::new();
    for key in ButtonRouter::output_keys().chain(EXTRA_KEYS) {
        keys.insert(key);
    }
    keys
}

/// Destination for synthesized events.
pub trait OutputSink: Send {
    /// Writes `events` followed by one SYN_REPORT, so consumers see them as a
    /// single atomic update.
    fn emit(&mut self, events: &[InputEvent]) -> io::Result<()>;
}

/// uinput-backed pointer + keyboard.
pub struct VirtualPointer {
    device: VirtualDevice,
}

impl VirtualPointer {
    /// Registers the virtual device under `name`.
    ///
    /// The device exposes exactly [`OUTPUT_AXES`] and [`output_keys`]; the
    /// node it shows up as is logged so it can be found in `/dev/input`.
    pub fn create(name: &str) -> io::Result<Self> {
        let mut axes = AttributeSet::<RelativeAxisCode>::new();
        for axis in OUTPUT_AXES {
            axes.insert(axis);
        }

        let mut device = VirtualDevice::builder()?
            .name(name)
            .with_relative_axes(&axes)?
            .with_keys(&output_keys())?
            .build()?;

        match dev_nodes(&mut device) {
            Ok(nodes) => info!("Created virtual device: {} ({})", name, describe_nodes(&nodes)),
            Err(e) => {
                info!("Created virtual device: {}", name);
                debug!("Could not list device nodes of {}: {}", name, e);
            }
        }
        Ok(Self { device })
    }
}

fn dev_nodes(device: &mut VirtualDevice) -> io::Result<Vec<PathBuf>> {
    device.enumerate_dev_nodes_blocking()?.collect()
}

fn describe_nodes(nodes: &[PathBuf]) -> String {
    if nodes.is_empty() {
        return "no device node yet".to_string();
    }
    nodes
        .iter()
        .map(|node| node.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl OutputSink for VirtualPointer {
    fn emit(&mut self, events: &[InputEvent]) -> io::Result<()> {
        self.device.emit(events)
    }
}

impl Drop for VirtualPointer {
    fn drop(&mut self) {
        info!("Destroying virtual device");
    }
}
