//! Unified error types for the ColdTrace firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! worker loops' error handling uniform. All variants are `Copy` so they
//! can be passed across the sampler, the GATT callbacks and the streamer
//! without allocation.
//!
//! No error in this crate is fatal: the worst outcome of any failure is a
//! tick or a GATT access that produced no data.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The DHT22 read failed (transient, retried by the sampler).
    Decode(DecodeError),
    /// A control characteristic write was malformed.
    Control(ControlError),
    /// A GATT access was denied by the link security gate.
    Access(AccessError),
    /// A wire frame did not fit its buffer.
    Wire(WireError),
    /// The wireless stack rejected a call.
    Radio(RadioError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "sensor: {e}"),
            Self::Control(e) => write!(f, "control: {e}"),
            Self::Access(e) => write!(f, "access: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor decode errors
// ---------------------------------------------------------------------------

/// The timing window that expired during a DHT22 transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sensor never pulled the line low after release.
    ResponseLow,
    /// Sensor never released its 80 µs low response.
    ResponseHigh,
    /// Sensor never ended its 80 µs high preamble.
    PreambleEnd,
    /// A bit's 50 µs low separator never ended.
    BitStart,
    /// A bit's high pulse lasted longer than any valid symbol.
    BitHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// An expected edge did not occur within its window.
    Timeout(Phase),
    /// Sum of the first four bytes does not match the fifth.
    ChecksumMismatch,
    /// Both fields decoded as exactly zero.
    GhostReading,
    /// The GPIO driver returned an error.
    Pin,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(phase) => write!(f, "timeout waiting for {:?}", phase),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::GhostReading => write!(f, "ghost reading (all-zero frame)"),
            Self::Pin => write!(f, "GPIO access failed"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Control protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Opcode is not part of the control protocol.
    InvalidCommand(u8),
    /// Write is empty or its payload does not match the opcode.
    InvalidPayloadLength,
    /// `SetActiveBatch` carried the reserved id 0.
    InvalidBatchId,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand(op) => write!(f, "unknown opcode 0x{:02x}", op),
            Self::InvalidPayloadLength => write!(f, "invalid payload length"),
            Self::InvalidBatchId => write!(f, "batch id 0 is reserved"),
        }
    }
}

impl From<ControlError> for Error {
    fn from(e: ControlError) -> Self {
        Self::Control(e)
    }
}

// ---------------------------------------------------------------------------
// Link security errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// No central is attached.
    NotConnected,
    /// The link exists but is not encrypted.
    InsufficientEncryption,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "no active connection"),
            Self::InsufficientEncryption => write!(f, "link not encrypted"),
        }
    }
}

impl From<AccessError> for Error {
    fn from(e: AccessError) -> Self {
        Self::Access(e)
    }
}

// ---------------------------------------------------------------------------
// Wire and radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Destination buffer is smaller than the encoded frame.
    CapacityExceeded,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "buffer capacity exceeded"),
        }
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Characteristic handle has not been registered yet.
    NotRegistered,
    /// The stack could not allocate a buffer for the notification.
    OutOfBuffers,
    /// The stack returned a raw error code.
    Stack(i32),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "characteristic not registered"),
            Self::OutOfBuffers => write!(f, "out of notification buffers"),
            Self::Stack(rc) => write!(f, "stack error rc={}", rc),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Override could not be parsed.
    Malformed,
    /// A field failed range validation; names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config"),
            Self::ValidationFailed(field) => write!(f, "validation failed: {}", field),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// ATT mapping
// ---------------------------------------------------------------------------

/// ATT error codes returned from GATT access callbacks.
pub mod att {
    pub const READ_NOT_PERMITTED: u8 = 0x02;
    pub const WRITE_NOT_PERMITTED: u8 = 0x03;
    pub const INVALID_ATTR_VALUE_LEN: u8 = 0x0D;
    pub const UNLIKELY: u8 = 0x0E;
    pub const INSUFFICIENT_ENC: u8 = 0x0F;
    pub const INSUFFICIENT_RES: u8 = 0x11;
    pub const VALUE_NOT_ALLOWED: u8 = 0x13;
}

impl Error {
    /// ATT status a GATT access callback should report for this error.
    pub const fn att_code(self) -> u8 {
        match self {
            Self::Access(AccessError::InsufficientEncryption) => att::INSUFFICIENT_ENC,
            Self::Control(ControlError::InvalidPayloadLength) => att::INVALID_ATTR_VALUE_LEN,
            Self::Control(ControlError::InvalidCommand(_) | ControlError::InvalidBatchId) => {
                att::VALUE_NOT_ALLOWED
            }
            Self::Wire(WireError::CapacityExceeded) | Self::Radio(RadioError::OutOfBuffers) => {
                att::INSUFFICIENT_RES
            }
            _ => att::UNLIKELY,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_denial_maps_to_insufficient_encryption() {
        let e: Error = AccessError::InsufficientEncryption.into();
        assert_eq!(e.att_code(), 0x0F);
    }

    #[test]
    fn protocol_errors_map_to_distinct_att_codes() {
        assert_eq!(Error::from(ControlError::InvalidPayloadLength).att_code(), 0x0D);
        assert_eq!(Error::from(ControlError::InvalidCommand(9)).att_code(), 0x13);
        assert_eq!(Error::from(ControlError::InvalidBatchId).att_code(), 0x13);
        assert_eq!(Error::from(AccessError::NotConnected).att_code(), 0x0E);
    }

    #[test]
    fn display_names_the_phase() {
        let e = Error::from(DecodeError::Timeout(Phase::BitHigh));
        let s = format!("{e}");
        assert!(s.contains("BitHigh"), "got {s}");
    }
}
