//! Worker threads as FreeRTOS tasks with explicit priority and stack.
//!
//! `esp_pthread_set_cfg()` configures the *next* `pthread_create()` from
//! the calling thread, so each config/spawn pair runs back to back on the
//! main thread.
//!
//! ## Workers on the ESP32-H2
//!
//! The H2 has one core, so both workers share it with the Bluedroid host
//! task and affinity only matters on dual-core parts. Priority decides
//! who runs:
//!
//! | Task     | Priority | Blocks in                          |
//! |----------|----------|------------------------------------|
//! | sampler  | 5        | DHT22 busy-poll (~5 ms per read)   |
//! | history  | 4        | notify, then the inter-record gap  |
//!
//! The sampler outranks the streamer so a long history pass cannot delay
//! a read past its period, and the single-wire timing loop is not
//! preempted by a notification burst. Both stay below the BLE controller
//! tasks.
//!
//! Off-target, spawning falls back to a plain named `std::thread`.

use std::io;
use std::thread::JoinHandle;

/// Core affinity for a spawned worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    /// Core 0. The only core on single-core parts such as the ESP32-H2.
    Pro,
    /// Core 1 on dual-core parts.
    App,
    /// Let the scheduler pick.
    Any,
}

impl Core {
    #[cfg(target_os = "espidf")]
    fn affinity(self) -> i32 {
        match self {
            Self::Pro => 0,
            Self::App => 1,
            Self::Any => esp_idf_sys::tskNO_AFFINITY as i32,
        }
    }
}

/// Spawn a worker thread with explicit affinity, priority and stack.
///
/// The `name` parameter must be a null-terminated string (e.g. `"sampler\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core.affinity();
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr() as *const _;
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new().name(display_name.into()).spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
