//! Application service, the hexagonal core.
//!
//! [`TelemetryService`] owns the telemetry store, the link monitor and the
//! stream request slot, and holds the radio port. GATT callbacks and both
//! workers reach shared state only through it.
//!
//! ```text
//!  GATT callbacks ──▶ ┌──────────────────────────────┐ ──▶ RadioPort
//!  Sampler ─────────▶ │       TelemetryService        │
//!  Streamer ────────▶ │ store · link · stream requests│
//!                     └──────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::error::{Error, Result};

use super::commands::ControlCommand;
use super::link::{LinkActions, LinkEvent, LinkMonitor};
use super::ports::{Characteristic, RadioPort};
use super::stream::StreamRequests;
use super::telemetry::TelemetryStore;
use super::wire::PAYLOAD_FRAME_LEN;

// ───────────────────────────────────────────────────────────────
// TelemetryService
// ───────────────────────────────────────────────────────────────

pub struct TelemetryService<R: RadioPort> {
    store: TelemetryStore,
    link: LinkMonitor,
    requests: StreamRequests,
    radio: R,
}

impl<R: RadioPort> TelemetryService<R> {
    pub fn new(radio: R) -> Self {
        Self {
            store: TelemetryStore::new(),
            link: LinkMonitor::new(),
            requests: StreamRequests::new(),
            radio,
        }
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn link(&self) -> &LinkMonitor {
        &self.link
    }

    pub fn requests(&self) -> &StreamRequests {
        &self.requests
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    // ── Connection events ─────────────────────────────────────

    /// Feed one stack event through the link state machine and carry out
    /// the side effects it asks for.
    pub fn on_link_event(&self, event: LinkEvent) -> LinkActions {
        let actions = self.link.apply(event);

        if let Some(conn) = actions.initiate_security {
            self.radio.initiate_security(conn);
        }
        if actions.stop_stream {
            self.requests.request_stop();
        }
        if actions.restart_advertising {
            self.radio.start_advertising();
        }
        if actions.notify_payload {
            self.publish_payload();
        }
        actions
    }

    // ── GATT access ───────────────────────────────────────────

    /// Direct read of the payload characteristic. Consumes the aggregate.
    pub fn read_payload(&self) -> Result<[u8; PAYLOAD_FRAME_LEN]> {
        self.link.authorize(&self.radio).inspect_err(|e| {
            debug!("GATT | payload read denied: {}", e);
        })?;
        Ok(self.store.take().encode())
    }

    /// Decode and apply one control write. Nothing is applied on error.
    pub fn write_control(&self, raw: &[u8]) -> Result<ControlCommand> {
        self.link.authorize(&self.radio).inspect_err(|e| {
            debug!("GATT | control write denied: {}", e);
        })?;
        let cmd = ControlCommand::decode(raw).inspect_err(|e| {
            warn!("GATT | control write rejected: {}", e);
        })?;
        self.apply(cmd)?;
        Ok(cmd)
    }

    fn apply(&self, cmd: ControlCommand) -> Result<()> {
        match cmd {
            ControlCommand::StreamStart => self.requests.request_start(),
            ControlCommand::StreamStop => self.requests.request_stop(),
            ControlCommand::HistoryClear => self.store.history_clear(),
            ControlCommand::SetActiveBatch(id) => self.store.set_active_batch(id)?,
            ControlCommand::ClearActiveBatch => self.store.clear_active_batch(),
        }
        info!("CTRL | {:?}", cmd);
        Ok(())
    }

    // ── Notifications ─────────────────────────────────────────

    /// Best-effort notification of the current aggregate. Returns whether
    /// a notification was handed to the stack.
    pub fn publish_payload(&self) -> bool {
        let Some(conn) = self.link.authorize_notify(&self.radio, Characteristic::Payload) else {
            return false;
        };
        let frame = self.store.peek().encode();
        match self.radio.notify(conn, Characteristic::Payload, &frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("GATT | payload notify failed: {}", Error::from(e));
                false
            }
        }
    }
}
