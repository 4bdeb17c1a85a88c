//! Turns a gamepad into a pointer and keyboard.
//!
//! The movement stick moves the pointer, the scroll stick drives the
//! high-resolution wheels, triggers act as Ctrl/Shift, the hat becomes arrow
//! keys and buttons map onto mouse buttons and desktop shortcuts. Output goes
//! through one uinput device that lives as long as the process, while gamepads
//! may come and go.

pub mod config;
pub mod daemon;
pub mod device;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod translate;

#[cfg(test)]
mod testing;
