//! Application core: pure domain logic, zero I/O.
//!
//! Business rules for the ColdTrace node: aggregation and history,
//! link security gating, the control protocol and the two workers.
//! All interaction with hardware and the radio happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod commands;
pub mod link;
pub mod ports;
pub mod sampler;
pub mod service;
pub mod stream;
pub mod telemetry;
pub mod wire;
