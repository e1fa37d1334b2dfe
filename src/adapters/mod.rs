//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter | Implements | Connects to                 |
//! |---------|------------|-----------------------------|
//! | `ble`   | RadioPort  | Bluedroid GATT server       |
//! | `time`  | ClockPort  | ESP32 high-resolution timer |
//!
//! The sensor port is implemented by [`crate::sensors::Dht22`] directly
//! over `embedded-hal` traits.

pub mod ble;
pub mod time;
