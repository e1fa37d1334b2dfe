//! Mock adapters for integration tests.
//!
//! Records every radio call so tests can assert on the full notification
//! history without a BLE stack, and scripts sensor results per read.

use coldtrace::app::ports::{Characteristic, ClockPort, ConnHandle, RadioPort, SensorPort};
use coldtrace::app::telemetry::SensorSample;
use coldtrace::error::{DecodeError, Phase, RadioError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Notify {
        conn: ConnHandle,
        characteristic: Characteristic,
        data: Vec<u8>,
    },
    StartAdvertising,
    InitiateSecurity(ConnHandle),
}

type NotifyHook = Box<dyn Fn(usize) + Send + Sync>;

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    pub calls: Mutex<Vec<RadioCall>>,
    /// What the "stack" reports for the live link.
    pub encrypted: AtomicBool,
    pub known: AtomicBool,
    /// Runs after each history notification with the running count.
    hook: Mutex<Option<NotifyHook>>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_link(&self, known: bool, encrypted: bool) {
        self.known.store(known, Ordering::Relaxed);
        self.encrypted.store(encrypted, Ordering::Relaxed);
    }

    pub fn on_history_notify(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn clear_hook(&self) {
        *self.hook.lock().unwrap() = None;
    }

    pub fn notifications(&self, characteristic: Characteristic) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                RadioCall::Notify {
                    characteristic: ch,
                    data,
                    ..
                } if *ch == characteristic => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sequence numbers of every history notification so far.
    pub fn history_sequences(&self) -> Vec<u16> {
        self.notifications(Characteristic::History)
            .iter()
            .map(|d| u16::from_le_bytes([d[13], d[14]]))
            .collect()
    }

    pub fn count(&self, call: &RadioCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl RadioPort for MockRadio {
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), RadioError> {
        self.calls.lock().unwrap().push(RadioCall::Notify {
            conn,
            characteristic,
            data: data.to_vec(),
        });
        if characteristic == Characteristic::History {
            let sent = self.notifications(Characteristic::History).len();
            if let Some(hook) = self.hook.lock().unwrap().as_ref() {
                hook(sent);
            }
        }
        Ok(())
    }

    fn start_advertising(&self) {
        self.calls.lock().unwrap().push(RadioCall::StartAdvertising);
    }

    fn initiate_security(&self, conn: ConnHandle) {
        self.calls
            .lock()
            .unwrap()
            .push(RadioCall::InitiateSecurity(conn));
    }

    fn link_encrypted(&self, _conn: ConnHandle) -> Option<bool> {
        self.known
            .load(Ordering::Relaxed)
            .then(|| self.encrypted.load(Ordering::Relaxed))
    }
}

// ── MockSensor ────────────────────────────────────────────────

pub struct MockSensor {
    pub script: VecDeque<Result<SensorSample, DecodeError>>,
    pub reads: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl MockSensor {
    pub fn new(script: impl IntoIterator<Item = Result<SensorSample, DecodeError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            reads: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl SensorPort for MockSensor {
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.script
            .pop_front()
            .unwrap_or(Err(DecodeError::Timeout(Phase::ResponseLow)))
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockClock(pub Arc<AtomicU32>);

#[allow(dead_code)]
impl MockClock {
    pub fn advance(&self, secs: u32) {
        self.0.fetch_add(secs, Ordering::Relaxed);
    }
}

impl ClockPort for MockClock {
    fn uptime_secs(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}
