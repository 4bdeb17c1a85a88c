//! One gamepad, from claim to disconnect.
//!
//! A session owns the located event source and borrows the virtual device.
//! Every loop iteration waits on exactly one of
//!
//! ```text
//!   termination ─┐
//!   gamepad event├──► select! (biased) ──► translate ──► emit motion
//!   motion tick ─┘      (tick only while a stick is moving)
//! ```
//!
//! then re-evaluates both sticks with the time that passed, so a held stick
//! keeps moving the pointer even when the gamepad itself stays silent.
//! All state lives in [`SessionState`] and starts fresh with every session.

use crate::config::Config;
use crate::device::{is_disconnect, EventSource, OutputSink};
use crate::error::DaemonError;
use crate::translate::{
    key_event, relative_event, AxisAccelerator, ButtonRouter, EdgeKeyMapper, HysteresisLatch,
    Thresholds,
};
use evdev::{
    AbsoluteAxisCode, EventSummary, EventType, InputEvent, KeyCode, RelativeAxisCode,
    SynchronizationCode,
};
use std::collections::BTreeSet;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The gamepad went away. The daemon goes looking for another one.
    Disconnected,
    /// Termination was requested. Nothing further is emitted.
    Terminated,
}

/// Tunables shared by every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub pointer: AxisAccelerator,
    pub scroll: AxisAccelerator,
    pub triggers: Thresholds,
    /// Re-evaluation interval while motion is pending.
    pub motion_interval: Duration,
}

impl SessionSettings {
    /// Settings taken from the validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            pointer: config.pointer,
            scroll: config.scroll,
            triggers: config.triggers,
            motion_interval: config.motion_interval(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Last raw position of one stick and the delta it produced last time.
#[derive(Debug, Clone, Copy, Default)]
struct AxisState {
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
}

impl AxisState {
    fn advance(&mut self, curve: &AxisAccelerator, elapsed: Duration) -> (i32, i32) {
        self.dx = curve.delta(self.x, elapsed);
        self.dy = curve.delta(self.y, elapsed);
        (self.dx, self.dy)
    }

    fn is_moving(&self, curve: &AxisAccelerator) -> bool {
        self.dx != 0 || self.dy != 0 || curve.is_displaced(self.x) || curve.is_displaced(self.y)
    }
}

/// Per-session translation state.
struct SessionState {
    movement: AxisState,
    scroll: AxisState,
    left_trigger: HysteresisLatch,
    right_trigger: HysteresisLatch,
    hat_x: EdgeKeyMapper,
    hat_y: EdgeKeyMapper,
    /// Output keys currently held down on the virtual device.
    held: BTreeSet<u16>,
}

impl SessionState {
    fn new(settings: &SessionSettings) -> Self {
        Self {
            movement: AxisState::default(),
            scroll: AxisState::default(),
            left_trigger: HysteresisLatch::new(settings.triggers, KeyCode::KEY_LEFTCTRL),
            right_trigger: HysteresisLatch::new(settings.triggers, KeyCode::KEY_LEFTSHIFT),
            hat_x: EdgeKeyMapper::horizontal(),
            hat_y: EdgeKeyMapper::vertical(),
            held: BTreeSet::new(),
        }
    }

    fn motion_pending(&self, settings: &SessionSettings) -> bool {
        self.movement.is_moving(&settings.pointer) || self.scroll.is_moving(&settings.scroll)
    }

    /// Updates state for one gamepad event. Returns the key batch it
    /// produces, if any.
    fn apply(&mut self, event: InputEvent) -> Option<Vec<InputEvent>> {
        let batch = match event.destructure() {
            EventSummary::AbsoluteAxis(_, axis, value) => self.apply_axis(axis, value),
            EventSummary::Key(_, button, value) => ButtonRouter::route(button, value),
            EventSummary::Synchronization(_, SynchronizationCode::SYN_DROPPED, _) => {
                warn!("Kernel dropped input events, device state may be stale");
                None
            }
            _ => None,
        };

        let batch = batch.filter(|batch| !batch.is_empty())?;
        self.track(&batch);
        Some(batch)
    }

    fn apply_axis(&mut self, axis: AbsoluteAxisCode, value: i32) -> Option<Vec<InputEvent>> {
        match axis {
            AbsoluteAxisCode::ABS_X => self.movement.x = value,
            AbsoluteAxisCode::ABS_Y => self.movement.y = value,
            AbsoluteAxisCode::ABS_RX => self.scroll.x = value,
            AbsoluteAxisCode::ABS_RY => self.scroll.y = value,
            AbsoluteAxisCode::ABS_Z => return self.left_trigger.update(value).map(|e| vec![e]),
            AbsoluteAxisCode::ABS_RZ => return self.right_trigger.update(value).map(|e| vec![e]),
            AbsoluteAxisCode::ABS_HAT0X => return Some(self.hat_x.update(value)),
            AbsoluteAxisCode::ABS_HAT0Y => return Some(self.hat_y.update(value)),
            _ => {}
        }
        None
    }

    fn track(&mut self, batch: &[InputEvent]) {
        for event in batch {
            if event.event_type() != EventType::KEY {
                continue;
            }
            if event.value() == 0 {
                self.held.remove(&event.code());
            } else {
                self.held.insert(event.code());
            }
        }
    }

    /// Key-up events for everything still held, clearing the set.
    fn release_all(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.held)
            .into_iter()
            .map(|code| key_event(KeyCode(code), 0))
            .collect()
    }
}

/// The one scroll event to emit for `(dx, dy)`. Horizontal wins only when
/// strictly larger; the horizontal wheel runs opposite to stick X.
pub fn scroll_event(dx: i32, dy: i32) -> Option<InputEvent> {
    if dx == 0 && dy == 0 {
        None
    } else if dx.unsigned_abs() > dy.unsigned_abs() {
        Some(relative_event(
            RelativeAxisCode::REL_HWHEEL_HI_RES,
            dx.saturating_neg(),
        ))
    } else {
        Some(relative_event(RelativeAxisCode::REL_WHEEL_HI_RES, dy))
    }
}

enum Wake {
    Terminate,
    Input(io::Result<InputEvent>),
    Tick,
}

/// Translates one claimed gamepad onto the virtual device.
///
/// The source is owned and closed when the session ends; the sink is only
/// borrowed, since it outlives every session.
pub struct TranslationSession<'a> {
    source: Box<dyn EventSource>,
    sink: &'a mut dyn OutputSink,
    settings: SessionSettings,
    state: SessionState,
}

impl<'a> TranslationSession<'a> {
    /// A session with fresh state: sticks centered, nothing latched or held.
    pub fn new(
        source: Box<dyn EventSource>,
        sink: &'a mut dyn OutputSink,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            source,
            sink,
            settings: *settings,
            state: SessionState::new(settings),
        }
    }

    fn emit(&mut self, batch: &[InputEvent]) -> Result<(), DaemonError> {
        trace!("Emitting {:?}", batch);
        self.sink.emit(batch).map_err(DaemonError::EmitError)
    }

    fn emit_motion(&mut self, elapsed: Duration) -> Result<(), DaemonError> {
        let (dx, dy) = self.state.movement.advance(&self.settings.pointer, elapsed);
        if dx != 0 || dy != 0 {
            self.emit(&[
                relative_event(RelativeAxisCode::REL_X, dx),
                relative_event(RelativeAxisCode::REL_Y, dy),
            ])?;
        }

        let (sx, sy) = self.state.scroll.advance(&self.settings.scroll, elapsed);
        if let Some(event) = scroll_event(sx, sy) {
            self.emit(&[event])?;
        }
        Ok(())
    }

    /// Runs until the gamepad disappears or `shutdown` fires. The source is
    /// closed when this returns.
    pub async fn run(mut self, shutdown: &CancellationToken) -> Result<SessionOutcome, DaemonError> {
        info!("Translating input from {}", self.source.name());
        let mut last = Instant::now();

        loop {
            let motion_pending = self.state.motion_pending(&self.settings);
            let interval = self.settings.motion_interval;
            let tick = async move {
                if motion_pending {
                    tokio::time::sleep(interval).await
                } else {
                    std::future::pending().await
                }
            };

            let wake = tokio::select! {
                biased;

                _ = shutdown.cancelled() => Wake::Terminate,
                result = self.source.next_event() => Wake::Input(result),
                _ = tick => Wake::Tick,
            };

            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;

            match wake {
                Wake::Terminate => {
                    debug!("Termination requested, leaving {}", self.source.name());
                    return Ok(SessionOutcome::Terminated);
                }
                Wake::Input(Ok(event)) => {
                    if let Some(batch) = self.state.apply(event) {
                        self.emit(&batch)?;
                    }
                }
                Wake::Input(Err(e)) if is_disconnect(&e) => {
                    info!("Gamepad disconnected: {}", self.source.name());
                    let released = self.state.release_all();
                    if !released.is_empty() {
                        debug!("Releasing {} held key(s)", released.len());
                        self.emit(&released)?;
                    }
                    return Ok(SessionOutcome::Disconnected);
                }
                Wake::Input(Err(source)) => {
                    return Err(DaemonError::DeviceReadError {
                        device: self.source.name().to_string(),
                        source,
                    });
                }
                Wake::Tick => {}
            }

            self.emit_motion(elapsed)?;
        }
    }
}
