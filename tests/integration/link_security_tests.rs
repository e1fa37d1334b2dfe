//! Integration tests: link state machine gating every data path.

use crate::mock_hw::{MockRadio, RadioCall};
use coldtrace::app::link::{LinkEvent, LinkState};
use coldtrace::app::ports::Characteristic;
use coldtrace::app::service::TelemetryService;
use coldtrace::app::telemetry::SensorSample;
use coldtrace::error::{AccessError, Error};
use std::sync::Arc;

fn service() -> (TelemetryService<Arc<MockRadio>>, Arc<MockRadio>) {
    let radio = MockRadio::new();
    (TelemetryService::new(Arc::clone(&radio)), radio)
}

fn subscribe(svc: &TelemetryService<Arc<MockRadio>>, characteristic: Characteristic) {
    svc.on_link_event(LinkEvent::Subscribe {
        characteristic,
        enabled: true,
    });
}

#[test]
fn full_lifecycle_walks_every_state() {
    let (svc, radio) = service();
    assert_eq!(svc.link().state(), LinkState::Disconnected);

    svc.on_link_event(LinkEvent::AdvertisingStarted);
    assert_eq!(svc.link().state(), LinkState::Connecting);

    radio.set_link(true, false);
    svc.on_link_event(LinkEvent::Connected(12));
    assert_eq!(svc.link().state(), LinkState::Unencrypted);
    assert_eq!(radio.count(&RadioCall::InitiateSecurity(12)), 1);
    assert_eq!(radio.count(&RadioCall::StartAdvertising), 0);

    radio.set_link(true, true);
    svc.on_link_event(LinkEvent::EncryptionChanged { success: true });
    assert_eq!(svc.link().state(), LinkState::Encrypted);

    radio.set_link(false, false);
    svc.on_link_event(LinkEvent::Disconnected);
    assert_eq!(svc.link().state(), LinkState::Disconnected);
    assert_eq!(radio.count(&RadioCall::StartAdvertising), 1);
}

#[test]
fn every_access_is_denied_without_encryption() {
    let (svc, radio) = service();
    svc.store().set_active_batch(1).unwrap();
    svc.store().fold_in(SensorSample::new(20.0, 40.0), 0);

    // No connection at all.
    assert_eq!(svc.read_payload(), Err(Error::Access(AccessError::NotConnected)));
    assert_eq!(
        svc.write_control(&[5]),
        Err(Error::Access(AccessError::NotConnected))
    );
    assert!(!svc.publish_payload());

    // Connected, subscribed, but not encrypted.
    radio.set_link(true, false);
    svc.on_link_event(LinkEvent::Connected(1));
    subscribe(&svc, Characteristic::Payload);
    assert_eq!(
        svc.read_payload(),
        Err(Error::Access(AccessError::InsufficientEncryption))
    );
    assert_eq!(
        svc.write_control(&[5]),
        Err(Error::Access(AccessError::InsufficientEncryption))
    );
    assert!(!svc.publish_payload());

    assert!(radio.notifications(Characteristic::Payload).is_empty());
    assert!(svc.store().is_batch_active());
    // The denied reads must not have consumed the aggregate.
    assert_eq!(svc.store().peek().temp_max, 20.0);
}

#[test]
fn failed_encryption_keeps_denying() {
    let (svc, radio) = service();
    radio.set_link(true, false);
    svc.on_link_event(LinkEvent::Connected(1));
    svc.on_link_event(LinkEvent::EncryptionChanged { success: false });
    assert_eq!(svc.link().state(), LinkState::Unencrypted);
    assert_eq!(
        svc.read_payload(),
        Err(Error::Access(AccessError::InsufficientEncryption))
    );
}

#[test]
fn stack_view_overrides_cached_encryption() {
    let (svc, radio) = service();
    radio.set_link(true, true);
    svc.on_link_event(LinkEvent::Connected(1));
    svc.on_link_event(LinkEvent::EncryptionChanged { success: true });
    assert!(svc.read_payload().is_ok());

    // Stack dropped encryption before telling us.
    radio.set_link(true, false);
    assert_eq!(
        svc.read_payload(),
        Err(Error::Access(AccessError::InsufficientEncryption))
    );
}

#[test]
fn pending_subscription_gets_one_opportunistic_notify() {
    let (svc, radio) = service();
    radio.set_link(true, false);
    svc.on_link_event(LinkEvent::Connected(3));
    subscribe(&svc, Characteristic::Payload);
    assert!(radio.notifications(Characteristic::Payload).is_empty());

    radio.set_link(true, true);
    svc.on_link_event(LinkEvent::EncryptionChanged { success: true });
    assert_eq!(radio.notifications(Characteristic::Payload).len(), 1);

    // Toggling subscriptions afterwards does not notify by itself.
    subscribe(&svc, Characteristic::History);
    assert_eq!(radio.notifications(Characteristic::Payload).len(), 1);
}

#[test]
fn reconnect_starts_with_clean_subscriptions() {
    let (svc, radio) = service();
    radio.set_link(true, true);
    svc.on_link_event(LinkEvent::Connected(1));
    svc.on_link_event(LinkEvent::EncryptionChanged { success: true });
    subscribe(&svc, Characteristic::Payload);
    subscribe(&svc, Characteristic::History);

    svc.on_link_event(LinkEvent::Disconnected);
    svc.on_link_event(LinkEvent::Connected(2));
    let ctx = svc.link().context();
    assert_eq!(ctx.connection, Some(2));
    assert!(!ctx.payload_subscribed);
    assert!(!ctx.history_subscribed);
    assert!(!ctx.is_encrypted);
}

#[test]
fn connect_failure_readvertises() {
    let (svc, radio) = service();
    svc.on_link_event(LinkEvent::AdvertisingStarted);
    svc.on_link_event(LinkEvent::ConnectFailed);
    assert_eq!(svc.link().state(), LinkState::Disconnected);
    assert_eq!(radio.count(&RadioCall::StartAdvertising), 1);
}
