//! Inbound control commands.
//!
//! Written by the peer to the control characteristic and interpreted by
//! the [`TelemetryService`](super::service::TelemetryService).
//!
//! ```text
//! ┌────────┬──────────────────────────┐
//! │ op u8  │ payload (opcode-specific)│
//! └────────┴──────────────────────────┘
//!  0x01 StreamStart        –
//!  0x02 StreamStop         –
//!  0x03 HistoryClear       –
//!  0x04 SetActiveBatch     batch_id u32 LE (non-zero)
//!  0x05 ClearActiveBatch   –
//! ```
//!
//! Decoding is strict: a write whose length does not match its opcode is
//! rejected as a whole.

use crate::error::ControlError;

pub const OP_STREAM_START: u8 = 0x01;
pub const OP_STREAM_STOP: u8 = 0x02;
pub const OP_HISTORY_CLEAR: u8 = 0x03;
pub const OP_SET_ACTIVE_BATCH: u8 = 0x04;
pub const OP_CLEAR_ACTIVE_BATCH: u8 = 0x05;

/// Commands the peer can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Request a history pass from the oldest record.
    StreamStart,
    /// Cancel an in-flight history pass.
    StreamStop,
    /// Drop all retained history.
    HistoryClear,
    /// Begin a batch; the id is guaranteed non-zero.
    SetActiveBatch(u32),
    ClearActiveBatch,
}

impl ControlCommand {
    /// Decode one control write.
    pub fn decode(raw: &[u8]) -> Result<Self, ControlError> {
        let (&op, payload) = raw
            .split_first()
            .ok_or(ControlError::InvalidPayloadLength)?;

        let cmd = match op {
            OP_STREAM_START => Self::StreamStart,
            OP_STREAM_STOP => Self::StreamStop,
            OP_HISTORY_CLEAR => Self::HistoryClear,
            OP_CLEAR_ACTIVE_BATCH => Self::ClearActiveBatch,
            OP_SET_ACTIVE_BATCH => {
                let id_bytes: [u8; 4] = payload
                    .try_into()
                    .map_err(|_| ControlError::InvalidPayloadLength)?;
                let id = u32::from_le_bytes(id_bytes);
                if id == 0 {
                    return Err(ControlError::InvalidBatchId);
                }
                return Ok(Self::SetActiveBatch(id));
            }
            other => return Err(ControlError::InvalidCommand(other)),
        };

        if !payload.is_empty() {
            return Err(ControlError::InvalidPayloadLength);
        }
        Ok(cmd)
    }

    pub const fn opcode(&self) -> u8 {
        match self {
            Self::StreamStart => OP_STREAM_START,
            Self::StreamStop => OP_STREAM_STOP,
            Self::HistoryClear => OP_HISTORY_CLEAR,
            Self::SetActiveBatch(_) => OP_SET_ACTIVE_BATCH,
            Self::ClearActiveBatch => OP_CLEAR_ACTIVE_BATCH,
        }
    }
}
