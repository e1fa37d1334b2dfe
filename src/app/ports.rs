//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TelemetryService (domain)
//! ```
//!
//! Driven adapters (sensor line, radio, clock) implement these traits.
//! The domain consumes them via generics, so the core never touches
//! ESP-IDF directly and every path runs on the host under test.
//!
//! ## Security notes
//!
//! - **RadioPort::link_encrypted** is the live source of truth for link
//!   security. The domain re-checks it before every exposure even when its
//!   own cached context already says "encrypted".

use crate::error::{DecodeError, RadioError};

use super::telemetry::SensorSample;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one complete sensor transaction per call.
///
/// No retry logic lives behind this trait; the sampler owns the retry
/// policy.
pub trait SensorPort {
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime source used to timestamp history records.
pub trait ClockPort {
    fn uptime_secs(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → wireless stack)
// ───────────────────────────────────────────────────────────────

/// Opaque connection handle assigned by the wireless stack.
pub type ConnHandle = u16;

/// The three endpoints of the primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Read + notify: rolling aggregate.
    Payload,
    /// Write-only: control commands.
    Control,
    /// Notify-only: history stream.
    History,
}

/// Calls the domain makes into the wireless stack.
///
/// Implementations are shared between the GATT callback context and both
/// worker threads, so every method takes `&self`.
pub trait RadioPort: Send + Sync {
    /// Send a notification carrying `data` on `characteristic`.
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), RadioError>;

    /// (Re)start connectable undirected advertising.
    fn start_advertising(&self);

    /// Ask the stack to pair/encrypt the given link.
    fn initiate_security(&self, conn: ConnHandle);

    /// Live encryption state of `conn`; `None` if the stack no longer
    /// knows the connection.
    fn link_encrypted(&self, conn: ConnHandle) -> Option<bool>;
}

impl<T: RadioPort + ?Sized> RadioPort for std::sync::Arc<T> {
    fn notify(
        &self,
        conn: ConnHandle,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), RadioError> {
        (**self).notify(conn, characteristic, data)
    }

    fn start_advertising(&self) {
        (**self).start_advertising();
    }

    fn initiate_security(&self, conn: ConnHandle) {
        (**self).initiate_security(conn);
    }

    fn link_encrypted(&self, conn: ConnHandle) -> Option<bool> {
        (**self).link_encrypted(conn)
    }
}
