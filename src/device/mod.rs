//! Linux input plumbing around the translation core.
//!
//! Each collaborator sits behind a trait so sessions and the daemon can be
//! driven by synthetic devices in tests:
//!
//! 1. [`locator`] - finds the first gamepad in the device namespace
//! 2. [`source`] - async event stream of the located gamepad
//! 3. [`output`] - the uinput virtual pointer/keyboard
//! 4. [`hotplug`] - inotify wake-ups when new device nodes appear
//!
//! ```text
//! /dev/input/eventN ──► locator ──► source ──► session ──► output (uinput)
//!        │                                                  ▲
//!        └── IN_CREATE ──► hotplug ──► daemon ──────────────┘
//! ```

pub mod hotplug;
pub mod locator;
pub mod output;
pub mod source;

pub use hotplug::{HotplugOutcome, HotplugSource, HotplugWatcher, InotifyWatch};
pub use locator::{Candidate, Capabilities, DeviceLocator, DeviceNamespace, EvdevNamespace};
pub use output::{OutputSink, VirtualPointer};
pub use source::{is_disconnect, EvdevSource, EventSource};
