//! GPIO / peripheral pin assignments for the ColdTrace node.
//!
//! Single source of truth. Drivers reference this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensors: single-wire
// ---------------------------------------------------------------------------

/// DHT22 data line. Open-drain with the internal pull-up enabled; the
/// host pulls it low to request a reading and releases it to listen.
pub const DHT_GPIO: i32 = 4;
