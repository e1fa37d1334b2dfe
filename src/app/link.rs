//! Connection / security state machine.
//!
//! ```text
//!  Disconnected ──AdvertisingStarted──▶ Connecting ──Connected(h)──▶ Unencrypted
//!       ▲                                                              │
//!       │        Disconnected / ConnectFailed        EncryptionChanged(ok)
//!       └──────────────────────────────────────────────────────────────┤
//!                                                                      ▼
//!                                                                  Encrypted
//! ```
//!
//! Stack callbacks are turned into [`LinkEvent`]s and run through the pure
//! [`transition`] function. The resulting [`ConnectionContext`] is packed
//! into a single atomic word so that workers and GATT callbacks read a
//! coherent context without locking. Side effects come back as
//! [`LinkActions`] for the caller to perform outside the transition.

use core::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info};

use crate::error::AccessError;

use super::ports::{Characteristic, ConnHandle, RadioPort};

// ───────────────────────────────────────────────────────────────
// Context
// ───────────────────────────────────────────────────────────────

/// Connection state as observed by data-exposure paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No central and not advertising.
    Disconnected,
    /// Advertising; waiting for a central.
    Connecting,
    /// Central attached, link not (yet) encrypted.
    Unencrypted,
    /// Central attached over an encrypted link.
    Encrypted,
}

/// The single active link. At most one peer is ever tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionContext {
    pub connection: Option<ConnHandle>,
    pub is_encrypted: bool,
    pub payload_subscribed: bool,
    pub history_subscribed: bool,
    pub advertising: bool,
}

const HANDLE_MASK: u32 = 0xFFFF;
const HAS_CONN: u32 = 1 << 16;
const ENCRYPTED: u32 = 1 << 17;
const PAYLOAD_SUB: u32 = 1 << 18;
const HISTORY_SUB: u32 = 1 << 19;
const ADVERTISING: u32 = 1 << 20;

impl ConnectionContext {
    pub fn state(&self) -> LinkState {
        match (self.connection, self.is_encrypted) {
            (None, _) if self.advertising => LinkState::Connecting,
            (None, _) => LinkState::Disconnected,
            (Some(_), false) => LinkState::Unencrypted,
            (Some(_), true) => LinkState::Encrypted,
        }
    }

    pub fn is_subscribed(&self, characteristic: Characteristic) -> bool {
        match characteristic {
            Characteristic::Payload => self.payload_subscribed,
            Characteristic::History => self.history_subscribed,
            Characteristic::Control => false,
        }
    }

    fn pack(self) -> u32 {
        let mut word = 0;
        if let Some(handle) = self.connection {
            word |= HAS_CONN | u32::from(handle);
        }
        if self.is_encrypted {
            word |= ENCRYPTED;
        }
        if self.payload_subscribed {
            word |= PAYLOAD_SUB;
        }
        if self.history_subscribed {
            word |= HISTORY_SUB;
        }
        if self.advertising {
            word |= ADVERTISING;
        }
        word
    }

    fn unpack(word: u32) -> Self {
        Self {
            connection: (word & HAS_CONN != 0).then_some((word & HANDLE_MASK) as ConnHandle),
            is_encrypted: word & ENCRYPTED != 0,
            payload_subscribed: word & PAYLOAD_SUB != 0,
            history_subscribed: word & HISTORY_SUB != 0,
            advertising: word & ADVERTISING != 0,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Events and actions
// ───────────────────────────────────────────────────────────────

/// Connection lifecycle events delivered by the wireless stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    AdvertisingStarted,
    /// Advertising ended without a connection.
    AdvertisingComplete,
    Connected(ConnHandle),
    ConnectFailed,
    Disconnected,
    EncryptionChanged { success: bool },
    Subscribe {
        characteristic: Characteristic,
        enabled: bool,
    },
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkActions {
    pub initiate_security: Option<ConnHandle>,
    pub restart_advertising: bool,
    pub stop_stream: bool,
    /// Push the current payload to a subscribed, now-encrypted peer.
    pub notify_payload: bool,
}

/// Pure transition function. No state besides `ctx` is consulted.
pub fn transition(ctx: ConnectionContext, event: LinkEvent) -> (ConnectionContext, LinkActions) {
    let mut next = ctx;
    let mut actions = LinkActions::default();

    match event {
        LinkEvent::AdvertisingStarted => {
            if ctx.connection.is_none() {
                next.advertising = true;
            }
        }
        LinkEvent::AdvertisingComplete => {
            next.advertising = false;
            actions.restart_advertising = ctx.connection.is_none();
        }
        LinkEvent::Connected(handle) => {
            next = ConnectionContext {
                connection: Some(handle),
                ..ConnectionContext::default()
            };
            actions.initiate_security = Some(handle);
        }
        LinkEvent::ConnectFailed | LinkEvent::Disconnected => {
            next = ConnectionContext::default();
            actions.restart_advertising = true;
            actions.stop_stream = true;
        }
        LinkEvent::EncryptionChanged { success } => {
            if ctx.connection.is_some() {
                next.is_encrypted = success;
                actions.notify_payload = success && ctx.payload_subscribed;
            }
        }
        LinkEvent::Subscribe {
            characteristic,
            enabled,
        } => {
            if ctx.connection.is_some() {
                match characteristic {
                    Characteristic::Payload => next.payload_subscribed = enabled,
                    Characteristic::History => next.history_subscribed = enabled,
                    Characteristic::Control => {}
                }
            }
        }
    }

    (next, actions)
}

// ───────────────────────────────────────────────────────────────
// Monitor
// ───────────────────────────────────────────────────────────────

/// Lock-free holder of the current [`ConnectionContext`].
pub struct LinkMonitor {
    word: AtomicU32,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
        }
    }

    pub fn context(&self) -> ConnectionContext {
        ConnectionContext::unpack(self.word.load(Ordering::Acquire))
    }

    pub fn state(&self) -> LinkState {
        self.context().state()
    }

    /// Run `event` through [`transition`] and publish the new context.
    pub fn apply(&self, event: LinkEvent) -> LinkActions {
        let step = |raw: u32| Some(transition(ConnectionContext::unpack(raw), event).0.pack());
        let prev_raw = match self.word.fetch_update(Ordering::AcqRel, Ordering::Acquire, step) {
            Ok(raw) | Err(raw) => raw,
        };
        let prev = ConnectionContext::unpack(prev_raw);
        let (next, actions) = transition(prev, event);
        if prev.state() != next.state() {
            info!("LINK | {:?} -> {:?} ({:?})", prev.state(), next.state(), event);
        } else {
            debug!("LINK | {:?} in {:?}", event, next.state());
        }
        actions
    }

    /// Gate for reads and writes: a connection must exist, be encrypted in
    /// our context, and be reported encrypted by the stack right now.
    pub fn authorize(&self, radio: &impl RadioPort) -> Result<ConnHandle, AccessError> {
        let ctx = self.context();
        let handle = ctx.connection.ok_or(AccessError::NotConnected)?;
        if !ctx.is_encrypted {
            return Err(AccessError::InsufficientEncryption);
        }
        match radio.link_encrypted(handle) {
            Some(true) => Ok(handle),
            Some(false) => Err(AccessError::InsufficientEncryption),
            None => Err(AccessError::NotConnected),
        }
    }

    /// Gate for notifications: [`authorize`](Self::authorize) plus an
    /// active subscription on `characteristic`.
    pub fn authorize_notify(
        &self,
        radio: &impl RadioPort,
        characteristic: Characteristic,
    ) -> Option<ConnHandle> {
        if !self.context().is_subscribed(characteristic) {
            return None;
        }
        self.authorize(radio).ok()
    }
}
