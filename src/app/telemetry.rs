//! Telemetry store: rolling min/max aggregate, active batch, history ring.
//!
//! ```text
//!   Sampler ──fold_in──▶ ┌──────────────────────────┐ ──peek/take──▶ Payload char
//!   Control ──batch────▶ │ Mutex<StoreInner>        │ ──history_at─▶ Streamer
//!                        │  aggregate · ring · seq  │
//!                        └──────────────────────────┘
//! ```
//!
//! Every operation takes the one lock for exactly its own span. Nothing
//! logs, sleeps or touches the radio while the lock is held.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ControlError;

// ───────────────────────────────────────────────────────────────
// Fixed configuration
// ───────────────────────────────────────────────────────────────

pub const TEMP_MIN_ALLOWED_C: f32 = -10.0;
pub const TEMP_MAX_ALLOWED_C: f32 = 60.0;
pub const HUMI_MIN_ALLOWED_PCT: f32 = 0.0;
pub const HUMI_MAX_ALLOWED_PCT: f32 = 100.0;

/// Records retained before the oldest is overwritten.
pub const HISTORY_CAPACITY: usize = 256;

// ───────────────────────────────────────────────────────────────
// Data model
// ───────────────────────────────────────────────────────────────

/// One decoded sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl SensorSample {
    pub const fn new(temperature_celsius: f32, humidity_percent: f32) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
        }
    }
}

/// Range classification of the most recent sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StatusFlag {
    #[default]
    Ok = 0,
    TempOutOfRange = 1,
    HumiOutOfRange = 2,
}

impl StatusFlag {
    /// Temperature violations take priority over humidity violations.
    pub fn classify(sample: SensorSample) -> Self {
        let t = sample.temperature_celsius;
        let h = sample.humidity_percent;
        if !(TEMP_MIN_ALLOWED_C..=TEMP_MAX_ALLOWED_C).contains(&t) {
            Self::TempOutOfRange
        } else if !(HUMI_MIN_ALLOWED_PCT..=HUMI_MAX_ALLOWED_PCT).contains(&h) {
            Self::HumiOutOfRange
        } else {
            Self::Ok
        }
    }
}

/// Copy of the rolling aggregate handed out to callers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateSnapshot {
    pub temp_min: f32,
    pub temp_max: f32,
    pub humi_min: f32,
    pub humi_max: f32,
    pub status_flag: StatusFlag,
    pub has_active_batch: bool,
    pub active_batch_id: u32,
}

impl AggregateSnapshot {
    /// The batch id, if a batch is active.
    pub fn active_batch(&self) -> Option<u32> {
        self.has_active_batch.then_some(self.active_batch_id)
    }

    fn reset_bounds(&mut self) {
        self.temp_min = 0.0;
        self.temp_max = 0.0;
        self.humi_min = 0.0;
        self.humi_max = 0.0;
        self.status_flag = StatusFlag::Ok;
    }
}

/// One accepted sample, as retained in the history ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRecord {
    pub uptime_seconds: u32,
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub status_flag: u8,
    pub sequence: u16,
}

impl HistoryRecord {
    const EMPTY: Self = Self {
        uptime_seconds: 0,
        temperature_celsius: 0.0,
        humidity_percent: 0.0,
        status_flag: 0,
        sequence: 0,
    };
}

// ───────────────────────────────────────────────────────────────
// History ring
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity circular buffer that overwrites its oldest entry.
pub struct HistoryRing<const N: usize> {
    slots: [HistoryRecord; N],
    /// Slot holding the oldest retained record.
    head: usize,
    len: usize,
}

impl<const N: usize> HistoryRing<N> {
    pub const fn new() -> Self {
        Self {
            slots: [HistoryRecord::EMPTY; N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        if self.len < N {
            self.slots[(self.head + self.len) % N] = record;
            self.len += 1;
        } else {
            self.slots[self.head] = record;
            self.head = (self.head + 1) % N;
        }
    }

    /// `index` 0 is the oldest retained record.
    pub fn get(&self, index: usize) -> Option<HistoryRecord> {
        (index < self.len).then(|| self.slots[(self.head + index) % N])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for HistoryRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

struct StoreInner {
    aggregate: AggregateSnapshot,
    /// False until the first fold since init, batch change or consuming read.
    folded: bool,
    history: HistoryRing<HISTORY_CAPACITY>,
    next_sequence: u16,
}

impl StoreInner {
    fn fold(&mut self, sample: SensorSample, uptime_seconds: u32) -> StatusFlag {
        let flag = StatusFlag::classify(sample);
        let t = sample.temperature_celsius;
        let h = sample.humidity_percent;

        let agg = &mut self.aggregate;
        if self.folded {
            agg.temp_min = agg.temp_min.min(t);
            agg.temp_max = agg.temp_max.max(t);
            agg.humi_min = agg.humi_min.min(h);
            agg.humi_max = agg.humi_max.max(h);
        } else {
            agg.temp_min = t;
            agg.temp_max = t;
            agg.humi_min = h;
            agg.humi_max = h;
        }
        agg.status_flag = flag;
        self.folded = true;

        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_add(1);
        self.history.push(HistoryRecord {
            uptime_seconds,
            temperature_celsius: t,
            humidity_percent: h,
            status_flag: flag as u8,
            sequence,
        });
        flag
    }
}

/// Shared telemetry state. Construct once and hand out behind an `Arc`.
pub struct TelemetryStore {
    inner: Mutex<StoreInner>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                aggregate: AggregateSnapshot::default(),
                folded: false,
                history: HistoryRing::new(),
                next_sequence: 0,
            }),
        }
    }

    // A panic while holding the lock cannot leave a half-applied fold
    // (each branch assigns plain fields), so poisoned state is still valid.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Incorporate one sample into the aggregate and append it to history.
    pub fn fold_in(&self, sample: SensorSample, uptime_seconds: u32) -> StatusFlag {
        self.lock().fold(sample, uptime_seconds)
    }

    /// [`fold_in`](Self::fold_in), but only while `batch_id` is still the
    /// active batch. The check and the commit share one lock, so a reading
    /// taken across a batch change or clear is dropped instead of landing
    /// in the new state.
    pub fn fold_in_for_batch(
        &self,
        batch_id: u32,
        sample: SensorSample,
        uptime_seconds: u32,
    ) -> Option<StatusFlag> {
        let mut inner = self.lock();
        if inner.aggregate.active_batch() != Some(batch_id) {
            return None;
        }
        Some(inner.fold(sample, uptime_seconds))
    }

    /// Start a new batch. Id 0 is reserved for "no batch".
    pub fn set_active_batch(&self, id: u32) -> Result<(), ControlError> {
        if id == 0 {
            return Err(ControlError::InvalidBatchId);
        }
        let mut inner = self.lock();
        inner.aggregate.reset_bounds();
        inner.aggregate.has_active_batch = true;
        inner.aggregate.active_batch_id = id;
        inner.folded = false;
        Ok(())
    }

    pub fn clear_active_batch(&self) {
        let mut inner = self.lock();
        inner.aggregate.reset_bounds();
        inner.aggregate.has_active_batch = false;
        inner.aggregate.active_batch_id = 0;
        inner.folded = false;
    }

    pub fn is_batch_active(&self) -> bool {
        self.lock().aggregate.has_active_batch
    }

    pub fn active_batch(&self) -> Option<u32> {
        self.lock().aggregate.active_batch()
    }

    /// Copy of the aggregate without side effects (notification path).
    pub fn peek(&self) -> AggregateSnapshot {
        self.lock().aggregate
    }

    /// Copy of the aggregate, then reset its bounds (direct-read path).
    ///
    /// The batch stays active; only the reporting window restarts.
    pub fn take(&self) -> AggregateSnapshot {
        let mut inner = self.lock();
        let snapshot = inner.aggregate;
        inner.aggregate.reset_bounds();
        inner.folded = false;
        snapshot
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn history_at_oldest(&self, index: usize) -> Option<HistoryRecord> {
        self.lock().history.get(index)
    }

    /// Drop all retained records. Sequence numbering continues.
    pub fn history_clear(&self) {
        self.lock().history.clear();
    }
}
