//! DHT22 / AM2302 single-wire temperature and humidity sensor.
//!
//! One transaction:
//!
//! ```text
//!  host  ‾‾\________/‾‾‾‾ (release)
//!  dht                  \____80µs____/‾‾‾‾80µs‾‾‾‾\ 40 × [ \_50µs_/‾‾26µs (0) | 70µs (1)‾‾\ ]
//! ```
//!
//! Bits arrive MSB first as 5 bytes: humidity (u16, tenths of %),
//! temperature (sign-magnitude u16, tenths of °C), checksum.
//!
//! ## Timing
//!
//! Pulse widths are measured by bounded busy-polling, one microsecond per
//! poll. Every wait has its own budget so a missing edge is reported as a
//! [`DecodeError::Timeout`] naming the phase instead of hanging the sampler.
//!
//! The line is open-drain with a pull-up: `set_low` drives it, `set_high`
//! releases it to the sensor.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::SensorPort;
use crate::app::telemetry::SensorSample;
use crate::error::{DecodeError, Phase};

/// Host start pulse (datasheet minimum is 1 ms).
const START_LOW_MS: u32 = 2;
/// Host release before listening for the response.
const RELEASE_US: u32 = 40;

const RESPONSE_LOW_TIMEOUT_US: u32 = 100;
const RESPONSE_HIGH_TIMEOUT_US: u32 = 100;
const PREAMBLE_END_TIMEOUT_US: u32 = 100;
const BIT_START_TIMEOUT_US: u32 = 70;
const BIT_HIGH_TIMEOUT_US: u32 = 120;

/// High pulses longer than this are a `1`.
const ONE_THRESHOLD_US: u32 = 40;

const FRAME_BITS: usize = 40;

const TEMP_SIGN: u16 = 0x8000;

pub struct Dht22<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Takes ownership of the data line and releases it to idle-high.
    pub fn new(mut pin: P, delay: D) -> Result<Self, DecodeError> {
        pin.set_high().map_err(|_| DecodeError::Pin)?;
        Ok(Self { pin, delay })
    }

    /// Clock one raw 5-byte frame off the wire.
    pub fn read_frame(&mut self) -> Result<[u8; 5], DecodeError> {
        self.pin.set_low().map_err(|_| DecodeError::Pin)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| DecodeError::Pin)?;
        self.delay.delay_us(RELEASE_US);

        self.wait_while(true, RESPONSE_LOW_TIMEOUT_US, Phase::ResponseLow)?;
        self.wait_while(false, RESPONSE_HIGH_TIMEOUT_US, Phase::ResponseHigh)?;
        self.wait_while(true, PREAMBLE_END_TIMEOUT_US, Phase::PreambleEnd)?;

        let mut frame = [0u8; 5];
        for bit in 0..FRAME_BITS {
            self.wait_while(false, BIT_START_TIMEOUT_US, Phase::BitStart)?;
            let high_us = self.wait_while(true, BIT_HIGH_TIMEOUT_US, Phase::BitHigh)?;
            frame[bit / 8] <<= 1;
            if high_us > ONE_THRESHOLD_US {
                frame[bit / 8] |= 1;
            }
        }
        Ok(frame)
    }

    /// Poll until the line leaves `level`; returns the microseconds spent.
    fn wait_while(&mut self, level: bool, budget_us: u32, phase: Phase) -> Result<u32, DecodeError> {
        let mut elapsed = 0;
        while self.pin.is_high().map_err(|_| DecodeError::Pin)? == level {
            if elapsed >= budget_us {
                return Err(DecodeError::Timeout(phase));
            }
            self.delay.delay_us(1);
            elapsed += 1;
        }
        Ok(elapsed)
    }
}

impl<P, D> SensorPort for Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError> {
        decode_frame(self.read_frame()?)
    }
}

/// Validate and convert a raw frame.
///
/// An all-zero reading is rejected as [`DecodeError::GhostReading`]: a
/// sensor that failed to sample clocks out zeros with a valid checksum.
/// A genuine 0.0 °C / 0.0 % reading is rejected too.
pub fn decode_frame(frame: [u8; 5]) -> Result<SensorSample, DecodeError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(DecodeError::ChecksumMismatch);
    }

    let humi_raw = u16::from_be_bytes([frame[0], frame[1]]);
    let temp_raw = u16::from_be_bytes([frame[2], frame[3]]);

    let humidity = f32::from(humi_raw) / 10.0;
    let magnitude = f32::from(temp_raw & !TEMP_SIGN) / 10.0;
    let temperature = if temp_raw & TEMP_SIGN != 0 {
        -magnitude
    } else {
        magnitude
    };

    if temperature == 0.0 && humidity == 0.0 {
        return Err(DecodeError::GhostReading);
    }
    Ok(SensorSample::new(temperature, humidity))
}
