//! Static gamepad button → output key routing.

use super::key_event;
use evdev::{InputEvent, KeyCode};

/// Button routes. Chorded entries press both keys together to reach
/// shortcuts no single button exposes (launcher, reverse tab).
const ROUTES: &[(KeyCode, &[KeyCode])] = &[
    (KeyCode::BTN_SOUTH, &[KeyCode::BTN_LEFT]),
    (KeyCode::BTN_EAST, &[KeyCode::BTN_RIGHT]),
    (KeyCode::BTN_WEST, &[KeyCode::BTN_EXTRA]),
    (KeyCode::BTN_NORTH, &[KeyCode::BTN_SIDE]),
    (KeyCode::BTN_SELECT, &[KeyCode::KEY_LEFTMETA]),
    (KeyCode::BTN_START, &[KeyCode::KEY_LEFTMETA, KeyCode::KEY_A]),
    (KeyCode::BTN_TR, &[KeyCode::KEY_TAB]),
    (KeyCode::BTN_TL, &[KeyCode::KEY_LEFTSHIFT, KeyCode::KEY_TAB]),
    (KeyCode::BTN_THUMBL, &[KeyCode::KEY_LEFTALT]),
    (KeyCode::BTN_THUMBR, &[KeyCode::KEY_ENTER]),
    (KeyCode::BTN_DPAD_UP, &[KeyCode::KEY_UP]),
    (KeyCode::BTN_DPAD_DOWN, &[KeyCode::KEY_DOWN]),
    (KeyCode::BTN_DPAD_LEFT, &[KeyCode::KEY_LEFT]),
    (KeyCode::BTN_DPAD_RIGHT, &[KeyCode::KEY_RIGHT]),
];

/// Fixed gamepad button → output key(s) table. Unlisted buttons are ignored.
pub struct ButtonRouter;

impl ButtonRouter {
    /// Output keys bound to `button`, if any.
    pub fn outputs(button: KeyCode) -> Option<&'static [KeyCode]> {
        ROUTES
            .iter()
            .find(|(input, _)| *input == button)
            .map(|(_, outputs)| *outputs)
    }

    /// Every key the router can emit.
    pub fn output_keys() -> impl Iterator<Item = KeyCode> {
        ROUTES.iter().flat_map(|(_, outputs)| outputs.iter().copied())
    }

    /// Forwards `value` (press, release or repeat) to every key bound to
    /// `button`. The returned events form one batch.
    pub fn route(button: KeyCode, value: i32) -> Option<Vec<InputEvent>> {
        Self::outputs(button).map(|keys| keys.iter().map(|key| key_event(*key, value)).collect())
    }
}
