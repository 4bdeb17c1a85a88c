//! Directional pad (hat) axis → arrow keys, edge-triggered.

use super::key_event;
use evdev::{InputEvent, KeyCode};

/// Maps one tri-state hat axis onto a pair of keys.
///
/// Only transitions produce events. Leaving a direction releases its key
/// before the opposite key is pressed, and both go out in the same batch, so
/// consumers never see both keys held at once.
#[derive(Debug, Clone, Copy)]
pub struct EdgeKeyMapper {
    negative: KeyCode,
    positive: KeyCode,
    position: i32,
}

impl EdgeKeyMapper {
    /// A centered hat axis driving `negative` below zero and `positive`
    /// above it.
    pub fn new(negative: KeyCode, positive: KeyCode) -> Self {
        Self {
            negative,
            positive,
            position: 0,
        }
    }

    /// ABS_HAT0X: left/right arrows.
    pub fn horizontal() -> Self {
        Self::new(KeyCode::KEY_LEFT, KeyCode::KEY_RIGHT)
    }

    /// ABS_HAT0Y: up/down arrows.
    pub fn vertical() -> Self {
        Self::new(KeyCode::KEY_UP, KeyCode::KEY_DOWN)
    }

    /// Last accepted position: -1, 0 or 1.
    pub fn position(&self) -> i32 {
        self.position
    }

    fn key_for(&self, position: i32) -> KeyCode {
        if position < 0 {
            self.negative
        } else {
            self.positive
        }
    }

    /// Feeds a raw hat value; returns the batch to emit (possibly empty).
    pub fn update(&mut self, raw: i32) -> Vec<InputEvent> {
        let next = raw.signum();
        let mut batch = Vec::with_capacity(2);
        if next == self.position {
            return batch;
        }

        if self.position != 0 {
            batch.push(key_event(self.key_for(self.position), 0));
        }
        if next != 0 {
            batch.push(key_event(self.key_for(next), 1));
        }

        self.position = next;
        batch
    }
}
