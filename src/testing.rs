//! Synthetic devices for driving sessions and the daemon in tests.

use crate::device::{Candidate, Capabilities, DeviceNamespace, EventSource, HotplugSource, OutputSink};
use async_trait::async_trait;
use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode};
use nix::errno::Errno;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn gamepad_capabilities() -> Capabilities {
    Capabilities::new(
        [
            AbsoluteAxisCode::ABS_X,
            AbsoluteAxisCode::ABS_Y,
            AbsoluteAxisCode::ABS_Z,
            AbsoluteAxisCode::ABS_RX,
            AbsoluteAxisCode::ABS_RY,
            AbsoluteAxisCode::ABS_RZ,
            AbsoluteAxisCode::ABS_HAT0X,
            AbsoluteAxisCode::ABS_HAT0Y,
        ],
        [
            KeyCode::BTN_SOUTH,
            KeyCode::BTN_EAST,
            KeyCode::BTN_NORTH,
            KeyCode::BTN_WEST,
            KeyCode::BTN_START,
            KeyCode::BTN_SELECT,
        ],
    )
}

pub fn abs(axis: AbsoluteAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, axis.0, value)
}

pub fn key(key: KeyCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY.0, key.code(), value)
}

/// `(type, code, value)` of one emitted event.
pub type Emitted = (u16, u16, i32);

#[derive(Clone, Default)]
pub struct Recording {
    batches: Arc<Mutex<Vec<Vec<Emitted>>>>,
    drops: Arc<AtomicUsize>,
}

impl Recording {
    pub fn batches(&self) -> Vec<Vec<Emitted>> {
        self.batches.lock().unwrap().clone()
    }

    /// Batches that carry at least one key event.
    pub fn key_batches(&self) -> Vec<Vec<Emitted>> {
        self.batches()
            .into_iter()
            .filter(|batch| batch.iter().any(|(type_, _, _)| *type_ == EventType::KEY.0))
            .collect()
    }

    /// Batches made only of relative motion.
    pub fn motion_batches(&self) -> Vec<Vec<Emitted>> {
        self.batches()
            .into_iter()
            .filter(|batch| batch.iter().all(|(type_, _, _)| *type_ == EventType::RELATIVE.0))
            .collect()
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// Output sink that records every batch.
pub struct RecordingSink {
    recording: Recording,
    fail_with: Option<i32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            recording: Recording::default(),
            fail_with: None,
        }
    }

    /// A sink whose every write fails with `errno`.
    pub fn failing(errno: Errno) -> Self {
        Self {
            recording: Recording::default(),
            fail_with: Some(errno as i32),
        }
    }

    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

impl OutputSink for RecordingSink {
    fn emit(&mut self, events: &[InputEvent]) -> io::Result<()> {
        if let Some(errno) = self.fail_with {
            return Err(io::Error::from_raw_os_error(errno));
        }
        let batch = events
            .iter()
            .map(|e| (e.event_type().0, e.code(), e.value()))
            .collect();
        self.recording.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        self.recording.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub enum SourceStep {
    Event(InputEvent),
    /// No input for this long.
    Wait(Duration),
    /// The node disappears (ENODEV).
    Disconnect,
    /// Read fails with this errno.
    Fail(i32),
    /// Requests termination; the rest of the script is only reached if the
    /// caller keeps reading.
    Cancel(CancellationToken),
}

/// Event source replaying a fixed script, then idling forever.
pub struct ScriptedSource {
    name: String,
    steps: VecDeque<SourceStep>,
    deadline: Option<Instant>,
}

impl ScriptedSource {
    pub fn new(name: &str, steps: Vec<SourceStep>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
            deadline: None,
        }
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> io::Result<InputEvent> {
        loop {
            let Some(step) = self.steps.front().cloned() else {
                return std::future::pending().await;
            };

            match step {
                SourceStep::Event(event) => {
                    self.steps.pop_front();
                    return Ok(event);
                }
                SourceStep::Wait(duration) => {
                    // The deadline outlives a dropped future, so a wait
                    // interrupted by a motion tick resumes instead of restarting.
                    let deadline = *self.deadline.get_or_insert(Instant::now() + duration);
                    tokio::time::sleep_until(deadline).await;
                    self.deadline = None;
                    self.steps.pop_front();
                }
                SourceStep::Disconnect => {
                    self.steps.pop_front();
                    return Err(io::Error::from_raw_os_error(Errno::ENODEV as i32));
                }
                SourceStep::Fail(errno) => {
                    self.steps.pop_front();
                    return Err(io::Error::from_raw_os_error(errno));
                }
                SourceStep::Cancel(token) => {
                    self.steps.pop_front();
                    token.cancel();
                    // Let the caller observe the cancellation before any
                    // further scripted input.
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct FakeDevice {
    name: String,
    capabilities: Capabilities,
    script: Vec<SourceStep>,
}

impl FakeDevice {
    pub fn new(name: &str, capabilities: Capabilities) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            script: Vec::new(),
        }
    }

    /// A gamepad that plays `script` once claimed.
    pub fn gamepad(name: &str, script: Vec<SourceStep>) -> Self {
        Self {
            script,
            ..Self::new(name, gamepad_capabilities())
        }
    }
}

/// Open/close/claim history of a [`FakeNamespace`].
#[derive(Clone, Default)]
pub struct NamespaceLog {
    entries: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
}

impl NamespaceLog {
    fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Successful opens, closes and claims in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Every open attempt, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

type Slots = Arc<Mutex<Vec<Option<FakeDevice>>>>;

/// Handle for plugging devices into a namespace after it was handed out.
#[derive(Clone)]
pub struct NamespacePlug {
    slots: Slots,
}

impl NamespacePlug {
    pub fn plug(&self, index: u32, device: FakeDevice) {
        let mut slots = self.slots.lock().unwrap();
        let index = index as usize;
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(device);
    }
}

/// In-memory device namespace. `None` entries fail to open; a claimed device
/// is gone from the namespace afterwards.
pub struct FakeNamespace {
    slots: Slots,
    log: NamespaceLog,
}

impl FakeNamespace {
    pub fn new(entries: Vec<Option<FakeDevice>>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(entries)),
            log: NamespaceLog::default(),
        }
    }

    pub fn log(&self) -> NamespaceLog {
        self.log.clone()
    }

    pub fn plug_handle(&self) -> NamespacePlug {
        NamespacePlug {
            slots: self.slots.clone(),
        }
    }
}

impl DeviceNamespace for FakeNamespace {
    fn open(&self, index: u32) -> io::Result<Box<dyn Candidate>> {
        self.log.attempts.fetch_add(1, Ordering::SeqCst);

        let device = self
            .slots
            .lock()
            .unwrap()
            .get(index as usize)
            .cloned()
            .flatten()
            .ok_or_else(|| io::Error::from_raw_os_error(Errno::ENOENT as i32))?;

        self.log.push(format!("open {index}"));
        Ok(Box::new(FakeCandidate {
            index,
            device,
            slots: self.slots.clone(),
            log: self.log.clone(),
            claimed: false,
        }))
    }
}

struct FakeCandidate {
    index: u32,
    device: FakeDevice,
    slots: Slots,
    log: NamespaceLog,
    claimed: bool,
}

impl Candidate for FakeCandidate {
    fn name(&self) -> &str {
        &self.device.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.device.capabilities
    }

    fn into_source(mut self: Box<Self>) -> io::Result<Box<dyn EventSource>> {
        self.claimed = true;
        self.log.push(format!("claim {}", self.index));
        if let Some(slot) = self.slots.lock().unwrap().get_mut(self.index as usize) {
            *slot = None;
        }
        Ok(Box::new(ScriptedSource::new(
            &self.device.name,
            self.device.script.clone(),
        )))
    }
}

impl Drop for FakeCandidate {
    fn drop(&mut self) {
        if !self.claimed {
            self.log.push(format!("close {}", self.index));
        }
    }
}

pub enum HotplugStep {
    /// `n` creation records are queued.
    Notify(usize),
    /// A device appears at `index`, with one notification.
    Plug(NamespacePlug, u32, FakeDevice),
    /// Reading the queue fails with this errno.
    Fail(i32),
    /// Requests termination and keeps waiting.
    Cancel(CancellationToken),
}

/// Notification queue replaying a fixed script, then idling forever.
pub struct ScriptedHotplug {
    steps: VecDeque<HotplugStep>,
    waits: Arc<AtomicUsize>,
}

impl ScriptedHotplug {
    pub fn new(steps: Vec<HotplugStep>) -> Self {
        Self {
            steps: steps.into(),
            waits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of waits actually started.
    pub fn waits(&self) -> Arc<AtomicUsize> {
        self.waits.clone()
    }
}

#[async_trait]
impl HotplugSource for ScriptedHotplug {
    async fn wait_for_creation(&mut self) -> io::Result<usize> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(HotplugStep::Notify(n)) => Ok(n),
            Some(HotplugStep::Plug(plug, index, device)) => {
                plug.plug(index, device);
                Ok(1)
            }
            Some(HotplugStep::Fail(errno)) => Err(io::Error::from_raw_os_error(errno)),
            Some(HotplugStep::Cancel(token)) => {
                token.cancel();
                std::future::pending().await
            }
            None => std::future::pending().await,
        }
    }
}
