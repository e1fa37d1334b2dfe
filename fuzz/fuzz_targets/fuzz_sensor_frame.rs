//! Fuzz target: `dht22::decode_frame`
//!
//! Any 5-byte frame either fails validation or yields finite values in
//! the range the 16-bit encoding can express.
//!
//! cargo fuzz run fuzz_sensor_frame

#![no_main]

use coldtrace::sensors::dht22::decode_frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|frame: [u8; 5]| {
    if let Ok(s) = decode_frame(frame) {
        let sum = frame[..4].iter().fold(0u8, |a, b| a.wrapping_add(*b));
        assert_eq!(sum, frame[4]);
        assert!(s.temperature_celsius.is_finite() && s.temperature_celsius.abs() <= 3276.7);
        assert!(s.humidity_percent.is_finite() && s.humidity_percent <= 6553.5);
    }
});
