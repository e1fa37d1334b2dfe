//! History streaming worker.
//!
//! The peer asks for a stream with a control write; the streamer then
//! walks the history ring oldest-first and emits one notification per
//! record, spaced by a fixed gap.
//!
//! ```text
//!  control write ──▶ StreamRequests { start, stop, doorbell }
//!                          │
//!                          ▼
//!  HistoryStreamer::run ── serve_pending ──▶ notify(History) × N
//! ```
//!
//! Requests coalesce: any number of starts before the worker wakes is one
//! start, and a start clears any stale stop. Cancellation is cooperative
//! and checked once per record.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use super::ports::{Characteristic, RadioPort};
use super::service::TelemetryService;

// ───────────────────────────────────────────────────────────────
// Request slot
// ───────────────────────────────────────────────────────────────

/// Single-slot start/stop request flags plus a wake-up doorbell.
pub struct StreamRequests {
    start: AtomicBool,
    stop: AtomicBool,
    doorbell: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for StreamRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRequests {
    pub const fn new() -> Self {
        Self {
            start: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            doorbell: Signal::new(),
        }
    }

    pub fn request_start(&self) {
        self.start.store(true, Ordering::Release);
        self.doorbell.signal(());
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.doorbell.signal(());
    }

    pub fn start_pending(&self) -> bool {
        self.start.load(Ordering::Acquire)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Consume a pending start. Clears both flags when one was pending.
    fn take_start(&self) -> bool {
        if !self.start.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.stop.store(false, Ordering::Release);
        true
    }

    async fn wait(&self) {
        self.doorbell.wait().await;
    }
}

// ───────────────────────────────────────────────────────────────
// Streamer
// ───────────────────────────────────────────────────────────────

/// Result of one [`HistoryStreamer::serve_pending`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// No start request was pending.
    Idle,
    /// A start was pending but the peer was not ready; request discarded.
    Dropped,
    /// Every record present at the start of the pass was emitted.
    Completed { sent: usize },
    /// A stop request ended the pass.
    Stopped { sent: usize },
    /// The link lost a precondition or the stack refused a notification.
    Aborted { sent: usize },
}

pub struct HistoryStreamer<R: RadioPort> {
    service: Arc<TelemetryService<R>>,
    gap: Duration,
    idle_poll: Duration,
}

impl<R: RadioPort> HistoryStreamer<R> {
    pub fn new(service: Arc<TelemetryService<R>>, gap: Duration, idle_poll: Duration) -> Self {
        Self {
            service,
            gap,
            idle_poll,
        }
    }

    /// Serve one pending start request, if any, as a complete pass.
    ///
    /// The pass walks indices `0..len` with `len` read at the start. Once
    /// the ring is full, every sample committed mid-pass shifts index 0 by
    /// one record, so the peer sees gaps in `sequence` while sampling runs.
    pub async fn serve_pending(&self) -> StreamOutcome {
        let svc = &*self.service;
        let requests = svc.requests();
        if !requests.take_start() {
            return StreamOutcome::Idle;
        }

        let (link, radio, store) = (svc.link(), svc.radio(), svc.store());
        if link.authorize_notify(radio, Characteristic::History).is_none() {
            debug!("STREAM | start dropped: peer not ready");
            return StreamOutcome::Dropped;
        }

        let total = store.history_len();
        info!("STREAM | pass started ({} records)", total);

        let mut sent = 0;
        for index in 0..total {
            if requests.stop_requested() {
                info!("STREAM | stopped after {} records", sent);
                return StreamOutcome::Stopped { sent };
            }
            let Some(conn) = link.authorize_notify(radio, Characteristic::History) else {
                info!("STREAM | link lost after {} records", sent);
                return StreamOutcome::Aborted { sent };
            };
            // Cleared underneath us.
            let Some(record) = store.history_at_oldest(index) else {
                break;
            };
            if let Err(e) = radio.notify(conn, Characteristic::History, &record.encode()) {
                warn!("STREAM | notify failed at seq {}: {}", record.sequence, e);
                return StreamOutcome::Aborted { sent };
            }
            sent += 1;

            if index + 1 < total && !self.gap.is_zero() {
                Timer::after(self.gap).await;
            }
        }

        info!("STREAM | pass complete ({} records)", sent);
        StreamOutcome::Completed { sent }
    }

    /// Worker loop. Sleeps on the doorbell, bounded by the idle poll.
    pub async fn run(&self) -> ! {
        loop {
            if self.serve_pending().await != StreamOutcome::Idle {
                continue;
            }
            futures_lite::future::or(self.service.requests().wait(), async {
                Timer::after(self.idle_poll).await;
            })
            .await;
        }
    }
}
