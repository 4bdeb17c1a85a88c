//! Gamepad → pointer/keyboard translation.
//!
//! Pure building blocks used by the translation session. None of them touch a
//! device; each one turns a piece of gamepad state into a batch of output
//! events that the session hands to the virtual device in one write.
//!
//! ```text
//! ABS_X/Y, ABS_RX/RY ──► accel   ──► REL_X/Y, REL_(H)WHEEL_HI_RES
//! ABS_Z, ABS_RZ      ──► latch   ──► KEY_LEFTCTRL, KEY_LEFTSHIFT
//! ABS_HAT0X/Y        ──► hat     ──► arrow keys
//! EV_KEY buttons     ──► buttons ──► mouse buttons / shortcuts
//! ```

pub mod accel;
pub mod buttons;
pub mod hat;
pub mod latch;

pub use accel::AxisAccelerator;
pub use buttons::ButtonRouter;
pub use hat::EdgeKeyMapper;
pub use latch::{HysteresisLatch, Thresholds};

use evdev::{EventType, InputEvent, KeyCode, RelativeAxisCode};

/// Builds a key event for the virtual device.
pub fn key_event(key: KeyCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY.0, key.code(), value)
}

/// Builds a relative-axis event for the virtual device.
pub fn relative_event(axis: RelativeAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE.0, axis.0, value)
}
