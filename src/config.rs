//! System configuration parameters
//!
//! Tunable timing for the ColdTrace node. Classification ranges, ring
//! capacity and decoder windows are fixed at compile time and live as
//! constants next to the code that uses them; only scheduling knobs are
//! configurable.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Sampling ---
    /// Interval between sampling ticks (milliseconds)
    pub sample_period_ms: u32,
    /// One-time delay after boot before the first read (milliseconds)
    pub boot_settle_ms: u32,
    /// Read attempts per tick before the tick is reported as failed
    pub read_attempts: u8,
    /// Delay between read attempts (milliseconds)
    pub retry_delay_ms: u32,

    // --- History streaming ---
    /// Gap between consecutive history notifications (milliseconds)
    pub stream_gap_ms: u32,
    /// Upper bound on how long the idle streamer sleeps between checks (milliseconds)
    pub stream_idle_poll_ms: u32,

    // --- Radio ---
    /// GAP device name used in advertising
    pub device_name: heapless::String<24>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("ESP32H2-DHT");
        Self {
            // Sampling
            sample_period_ms: 3000,
            boot_settle_ms: 2000, // DHT22 needs ~1 s after power-up
            read_attempts: 3,
            retry_delay_ms: 30,

            // Streaming
            stream_gap_ms: 20,
            stream_idle_poll_ms: 50,

            device_name,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON override and validate it.
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall a worker or break advertising.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("sample_period_ms must be > 0"));
        }
        if self.read_attempts == 0 {
            return Err(ConfigError::ValidationFailed("read_attempts must be > 0"));
        }
        if self.stream_idle_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("stream_idle_poll_ms must be > 0"));
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name must not be empty"));
        }
        Ok(())
    }
}
