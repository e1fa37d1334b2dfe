//! GATT wire layouts.
//!
//! All frames are little-endian, packed, no padding:
//!
//! ```text
//! Payload (22 B):  temp_min f32 │ temp_max f32 │ humi_min f32 │ humi_max f32 │ flag u8 │ has_batch u8 │ batch_id u32
//! History (15 B):  uptime u32   │ temp f32     │ humi f32     │ flag u8      │ seq u16
//! ```

use crate::error::WireError;

use super::telemetry::{AggregateSnapshot, HistoryRecord};

pub const PAYLOAD_FRAME_LEN: usize = 22;
pub const HISTORY_FRAME_LEN: usize = 15;

/// Sequential little-endian writer over a bounded buffer.
struct LeWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> LeWriter<'a> {
    fn new(buf: &'a mut [u8], needed: usize) -> Result<Self, WireError> {
        if buf.len() < needed {
            return Err(WireError::CapacityExceeded);
        }
        Ok(Self { buf, pos: 0 })
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

impl AggregateSnapshot {
    /// Encode into `buf`, returning the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        let mut w = LeWriter::new(buf, PAYLOAD_FRAME_LEN)?;
        w.put(&self.temp_min.to_le_bytes());
        w.put(&self.temp_max.to_le_bytes());
        w.put(&self.humi_min.to_le_bytes());
        w.put(&self.humi_max.to_le_bytes());
        w.put(&[self.status_flag as u8, u8::from(self.has_active_batch)]);
        w.put(&self.active_batch_id.to_le_bytes());
        Ok(w.pos)
    }

    pub fn encode(&self) -> [u8; PAYLOAD_FRAME_LEN] {
        let mut frame = [0u8; PAYLOAD_FRAME_LEN];
        // Exact-size buffer: cannot fail.
        let _ = self.encode_into(&mut frame);
        frame
    }
}

impl HistoryRecord {
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        let mut w = LeWriter::new(buf, HISTORY_FRAME_LEN)?;
        w.put(&self.uptime_seconds.to_le_bytes());
        w.put(&self.temperature_celsius.to_le_bytes());
        w.put(&self.humidity_percent.to_le_bytes());
        w.put(&[self.status_flag]);
        w.put(&self.sequence.to_le_bytes());
        Ok(w.pos)
    }

    pub fn encode(&self) -> [u8; HISTORY_FRAME_LEN] {
        let mut frame = [0u8; HISTORY_FRAME_LEN];
        let _ = self.encode_into(&mut frame);
        frame
    }
}
