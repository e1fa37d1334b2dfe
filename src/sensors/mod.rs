//! Sensor drivers.
//!
//! Each driver implements [`SensorPort`](crate::app::ports::SensorPort)
//! over `embedded-hal` traits, so the same code runs against ESP-IDF GPIO on
//! the device and against scripted waveforms in tests.

pub mod dht22;

pub use dht22::Dht22;
