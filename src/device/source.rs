//! Event stream of the active gamepad.
//!
//! Events are read through evdev's raw stream, so a kernel buffer overrun
//! (SYN_DROPPED) reaches the session as-is. Everything after the marker up to
//! the next SYN_REPORT is stale and gets discarded; the source then reads the
//! device's current axis and key state back and replays it as ordinary events.

use async_trait::async_trait;
use evdev::raw_stream::{EventStream, RawDevice};
use evdev::{AbsoluteAxisCode, EventSummary, EventType, InputEvent, SynchronizationCode};
use nix::errno::Errno;
use std::collections::{BTreeSet, VecDeque};
use std::io;
use tracing::debug;

/// A readable stream of `{type, code, value}` events from one gamepad.
#[async_trait]
pub trait EventSource: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Waits for the next event. Must be cancel safe: the session drops the
    /// future whenever another wake-up source wins.
    async fn next_event(&mut self) -> io::Result<InputEvent>;
}

/// True when `err` means the device node went away.
pub fn is_disconnect(err: &io::Error) -> bool {
    err.raw_os_error() == Some(Errno::ENODEV as i32)
}

/// What to do with one event read from the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Forward(InputEvent),
    /// Stale, part of an overrun.
    Skip,
    /// The overrun is over; read the device state back.
    Resync,
}

/// Device state as the kernel reports it right now.
#[derive(Debug, Default)]
struct Snapshot {
    axes: Vec<(AbsoluteAxisCode, i32)>,
    keys: BTreeSet<u16>,
}

impl Snapshot {
    fn read(device: &RawDevice) -> io::Result<Self> {
        let abs = device.get_abs_state()?;
        let axes = device
            .supported_absolute_axes()
            .map(|axes| {
                axes.iter()
                    .map(|axis| (axis, abs[axis.0 as usize].value))
                    .collect()
            })
            .unwrap_or_default();
        let keys = device.get_key_state()?.iter().map(|key| key.code()).collect();

        Ok(Self { axes, keys })
    }
}

/// Overrun bookkeeping between the kernel and the session.
#[derive(Debug, Default)]
struct StreamState {
    /// Keys the session has seen pressed.
    keys: BTreeSet<u16>,
    dropped: bool,
    /// Replayed state, handed out before anything new is read.
    pending: VecDeque<InputEvent>,
}

impl StreamState {
    fn observe(&mut self, event: InputEvent) -> Step {
        if self.dropped {
            return match event.destructure() {
                EventSummary::Synchronization(_, SynchronizationCode::SYN_REPORT, _) => {
                    self.dropped = false;
                    Step::Resync
                }
                _ => Step::Skip,
            };
        }

        match event.destructure() {
            EventSummary::Synchronization(_, SynchronizationCode::SYN_DROPPED, _) => {
                self.dropped = true;
            }
            EventSummary::Key(_, key, 0) => {
                self.keys.remove(&key.code());
            }
            EventSummary::Key(_, key, _) => {
                self.keys.insert(key.code());
            }
            _ => {}
        }
        Step::Forward(event)
    }

    /// Queues the current axis values and the key changes missed during the
    /// overrun, closed by one SYN_REPORT.
    fn resync(&mut self, snapshot: Snapshot) {
        for (axis, value) in snapshot.axes {
            self.pending
                .push_back(InputEvent::new(EventType::ABSOLUTE.0, axis.0, value));
        }
        for &code in self.keys.difference(&snapshot.keys) {
            self.pending
                .push_back(InputEvent::new(EventType::KEY.0, code, 0));
        }
        for &code in snapshot.keys.difference(&self.keys) {
            self.pending
                .push_back(InputEvent::new(EventType::KEY.0, code, 1));
        }
        self.pending.push_back(InputEvent::new(
            EventType::SYNCHRONIZATION.0,
            SynchronizationCode::SYN_REPORT.0,
            0,
        ));
        self.keys = snapshot.keys;
    }
}

/// A gamepad read through evdev, registered with the tokio reactor.
pub struct EvdevSource {
    name: String,
    stream: EventStream,
    state: StreamState,
}

impl EvdevSource {
    /// Claims `device`. The stream switches the descriptor to non-blocking
    /// reads and registers it with the reactor.
    pub fn new(device: RawDevice) -> io::Result<Self> {
        let name = device.name().unwrap_or("unnamed device").to_string();
        let stream = device.into_event_stream()?;
        Ok(Self {
            name,
            stream,
            state: StreamState::default(),
        })
    }
}

#[async_trait]
impl EventSource for EvdevSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> io::Result<InputEvent> {
        loop {
            if let Some(event) = self.state.pending.pop_front() {
                return Ok(event);
            }

            let event = self.stream.next_event().await?;
            match self.state.observe(event) {
                Step::Forward(event) => return Ok(event),
                Step::Skip => {}
                Step::Resync => {
                    let snapshot = Snapshot::read(self.stream.device())?;
                    debug!(
                        "Resynced {}: {} axes, {} key(s) down",
                        self.name,
                        snapshot.axes.len(),
                        snapshot.keys.len()
                    );
                    self.state.resync(snapshot);
                }
            }
        }
    }
}
