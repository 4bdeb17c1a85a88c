//! Analog trigger → modifier key, with hysteresis against chatter.

use super::key_event;
use evdev::{InputEvent, KeyCode};
use serde::{Deserialize, Serialize};

/// Press/release thresholds for an analog trigger. `release` must be below
/// `press`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub press: i32,
    pub release: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            press: 512,
            release: 256,
        }
    }
}

impl Thresholds {
    /// Next latched state for `magnitude`, given the current one.
    pub fn next_state(&self, pressed: bool, magnitude: i32) -> bool {
        if pressed {
            magnitude >= self.release
        } else {
            magnitude > self.press
        }
    }
}

/// One analog trigger latched onto one output key.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisLatch {
    thresholds: Thresholds,
    key: KeyCode,
    pressed: bool,
}

impl HysteresisLatch {
    /// A released latch for `key`.
    pub fn new(thresholds: Thresholds, key: KeyCode) -> Self {
        Self {
            thresholds,
            key,
            pressed: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feeds a new trigger magnitude. Returns the key event to emit on its own
    /// batch when the latch flips.
    pub fn update(&mut self, magnitude: i32) -> Option<InputEvent> {
        let next = self.thresholds.next_state(self.pressed, magnitude);
        if next == self.pressed {
            return None;
        }

        self.pressed = next;
        Some(key_event(self.key, i32::from(next)))
    }
}
