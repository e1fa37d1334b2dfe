//! ColdTrace firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │   Dht22 (SensorPort)   BleRadio (RadioPort)   MonotonicClock │
//! │                                                              │
//! │   ──────────────── Port Trait Boundary ─────────────────     │
//! │                                                              │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │          TelemetryService (pure logic)               │   │
//! │   │   store · link state machine · control protocol      │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! │   sampler thread                 streamer thread             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver, Pull};

use coldtrace::adapters::ble::{self, BleRadio};
use coldtrace::adapters::time::MonotonicClock;
use coldtrace::app::sampler::Sampler;
use coldtrace::app::service::TelemetryService;
use coldtrace::app::stream::HistoryStreamer;
use coldtrace::config::NodeConfig;
use coldtrace::drivers::task_pin::{Core, spawn_on_core};
use coldtrace::pins;
use coldtrace::sensors::Dht22;

/// Optional JSON override baked in at build time.
const CONFIG_OVERRIDE: Option<&str> = option_env!("COLDTRACE_CONFIG");

fn load_config() -> NodeConfig {
    let Some(raw) = CONFIG_OVERRIDE else {
        return NodeConfig::default();
    };
    match NodeConfig::from_json(raw.as_bytes()) {
        Ok(cfg) => {
            info!("Config override applied");
            cfg
        }
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ColdTrace v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();

    // ── 2. Sensor line ────────────────────────────────────────
    // Open-drain with pull-up: the decoder drives low and releases high.
    let pin = unsafe { AnyIOPin::new(pins::DHT_GPIO) };
    let mut line = PinDriver::input_output_od(pin)?;
    line.set_pull(Pull::Up)?;
    let sensor = Dht22::new(line, Ets).map_err(|e| anyhow::anyhow!("DHT22 init: {e}"))?;

    // ── 3. Service + radio ────────────────────────────────────
    let service = Arc::new(TelemetryService::new(BleRadio::new(config.device_name.clone())));
    ble::start(Arc::clone(&service)).map_err(|e| anyhow::anyhow!("BLE start: {e}"))?;

    // ── 4. Workers ────────────────────────────────────────────
    // The ESP32-H2 has a single core; priority alone orders the workers.
    let mut sampler = Sampler::new(Arc::clone(&service), sensor, MonotonicClock::new(), &config);
    let sampler_task = spawn_on_core(Core::Pro, 5, 6, "sampler\0", move || {
        sampler.run();
    })?;

    let streamer = HistoryStreamer::new(
        Arc::clone(&service),
        Duration::from_millis(config.stream_gap_ms.into()),
        Duration::from_millis(config.stream_idle_poll_ms.into()),
    );
    let streamer_task = spawn_on_core(Core::Pro, 4, 6, "history\0", move || {
        futures_lite::future::block_on(streamer.run());
    })?;

    info!(
        "Running: sample every {} ms, stream gap {} ms",
        config.sample_period_ms, config.stream_gap_ms
    );

    // Workers never return.
    let _ = sampler_task.join();
    let _ = streamer_task.join();
    Ok(())
}
