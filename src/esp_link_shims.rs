//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! - `critical-section` 1.x: `embassy-sync`'s `CriticalSectionRawMutex`
//!   (the stream doorbell) needs an acquire/release pair.
//! - `embassy-time-driver`: `async-io-mini` timers (stream gap and idle
//!   poll) need `now` and `schedule_wake`.
//!
//! Wakes are served by one alarm thread over a small deadline table. A
//! full table wakes its earliest entry immediately; the woken timer
//! re-arms itself, so that only costs a spurious poll.

use core::cell::{Cell, RefCell};
use core::task::Waker;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, Once, PoisonError};

use log::warn;

// ───────────────────────────────────────────────────────────────
// critical-section
// ───────────────────────────────────────────────────────────────

static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Re-entrant per thread: only the outermost acquire takes the mutex.
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            let lock = CRITICAL_SECTION_MUTEX
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            CRITICAL_SECTION_GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let new_depth = d.saturating_add(1);
        depth.set(new_depth);
        new_depth
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            CRITICAL_SECTION_GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    })
}

// ───────────────────────────────────────────────────────────────
// embassy-time driver
// ───────────────────────────────────────────────────────────────

const ALARM_SLOTS: usize = 8;
const ALARM_STACK_KB: usize = 3;

static ALARMS: Mutex<heapless::Vec<(u64, Waker), ALARM_SLOTS>> = Mutex::new(heapless::Vec::new());
static ALARM_CHANGED: Condvar = Condvar::new();
static ALARM_THREAD: Once = Once::new();

/// Microseconds since boot (`tick-hz-1_000_000`).
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut core::ffi::c_void) {
    if waker.is_null() {
        return;
    }
    // SAFETY: embassy-time passes a valid `&Waker` for the duration of the
    // call; it is cloned before returning.
    let waker = unsafe { &*(waker as *const Waker) };

    ALARM_THREAD.call_once(|| {
        let spawned = std::thread::Builder::new()
            .name("alarm".into())
            .stack_size(ALARM_STACK_KB * 1024)
            .spawn(alarm_loop);
        if let Err(e) = spawned {
            warn!("ALARM | thread spawn failed: {}", e);
        }
    });

    let mut alarms = ALARMS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(slot) = alarms.iter_mut().find(|(_, w)| w.will_wake(waker)) {
        slot.0 = slot.0.min(at);
    } else if let Err((at, waker)) = alarms.push((at, waker.clone())) {
        // Full: fire the earliest now and take its slot.
        if let Some(i) = earliest(&alarms) {
            let (_, evicted) = core::mem::replace(&mut alarms[i], (at, waker));
            evicted.wake();
        }
    }
    drop(alarms);
    ALARM_CHANGED.notify_one();
}

fn earliest(alarms: &[(u64, Waker)]) -> Option<usize> {
    alarms
        .iter()
        .enumerate()
        .min_by_key(|(_, (at, _))| *at)
        .map(|(i, _)| i)
}

fn alarm_loop() {
    let mut alarms = ALARMS.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        let now = _embassy_time_now();
        let mut i = 0;
        while i < alarms.len() {
            if alarms[i].0 <= now {
                let (_, waker) = alarms.swap_remove(i);
                waker.wake();
            } else {
                i += 1;
            }
        }

        alarms = match earliest(&alarms).map(|i| alarms[i].0) {
            Some(next) => {
                ALARM_CHANGED
                    .wait_timeout(alarms, Duration::from_micros(next - now))
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => ALARM_CHANGED
                .wait(alarms)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
}
