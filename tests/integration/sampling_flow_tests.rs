//! Integration tests: sampler → store → payload characteristic.

use crate::mock_hw::{MockClock, MockRadio, MockSensor};
use coldtrace::app::link::LinkEvent;
use coldtrace::app::ports::Characteristic;
use coldtrace::app::sampler::{Sampler, TickOutcome};
use coldtrace::app::service::TelemetryService;
use coldtrace::app::telemetry::{SensorSample, StatusFlag};
use coldtrace::config::NodeConfig;
use coldtrace::error::DecodeError;
use std::sync::Arc;
use std::sync::atomic::Ordering;

type Svc = TelemetryService<Arc<MockRadio>>;

fn fast_config() -> NodeConfig {
    NodeConfig {
        retry_delay_ms: 0,
        ..NodeConfig::default()
    }
}

fn paired_service() -> (Arc<Svc>, Arc<MockRadio>) {
    let radio = MockRadio::new();
    let svc = Arc::new(TelemetryService::new(Arc::clone(&radio)));
    radio.set_link(true, true);
    svc.on_link_event(LinkEvent::Connected(1));
    svc.on_link_event(LinkEvent::EncryptionChanged { success: true });
    (svc, radio)
}

fn f32_at(frame: &[u8], at: usize) -> f32 {
    f32::from_le_bytes(frame[at..at + 4].try_into().unwrap())
}

#[test]
fn batch_scenario_end_to_end() {
    let (svc, _radio) = paired_service();
    let clock = MockClock::default();
    let sensor = MockSensor::new([
        Ok(SensorSample::new(20.0, 40.0)),
        Ok(SensorSample::new(22.5, 38.0)),
        Ok(SensorSample::new(19.0, 45.0)),
    ]);
    let mut sampler = Sampler::new(Arc::clone(&svc), sensor, clock.clone(), &fast_config());

    svc.write_control(&[0x04, 0x01, 0x00, 0x00, 0x00]).unwrap();
    for _ in 0..3 {
        assert_eq!(sampler.tick(), TickOutcome::Committed(StatusFlag::Ok));
        clock.advance(3);
    }

    let frame = svc.read_payload().unwrap();
    assert_eq!(f32_at(&frame, 0), 19.0);
    assert_eq!(f32_at(&frame, 4), 22.5);
    assert_eq!(f32_at(&frame, 8), 38.0);
    assert_eq!(f32_at(&frame, 12), 45.0);
    assert_eq!(frame[16], StatusFlag::Ok as u8);
    assert_eq!(frame[17], 1);
    assert_eq!(&frame[18..22], &1u32.to_le_bytes());

    let store = svc.store();
    assert_eq!(store.history_len(), 3);
    let records: Vec<_> = (0..3).map(|i| store.history_at_oldest(i).unwrap()).collect();
    assert_eq!(
        records.iter().map(|r| r.sequence).collect::<Vec<_>>(),
        [0, 1, 2]
    );
    assert_eq!(
        records.iter().map(|r| r.uptime_seconds).collect::<Vec<_>>(),
        [0, 3, 6]
    );
}

#[test]
fn consecutive_reads_yield_degenerate_second_snapshot() {
    let (svc, _radio) = paired_service();
    svc.write_control(&[4, 9, 0, 0, 0]).unwrap();
    svc.store().fold_in(SensorSample::new(25.0, 55.0), 0);

    let first = svc.read_payload().unwrap();
    assert_eq!(f32_at(&first, 0), 25.0);
    let second = svc.read_payload().unwrap();
    assert_eq!(f32_at(&second, 0), f32_at(&second, 4));
    assert_eq!(f32_at(&second, 0), 0.0);
    assert_eq!(f32_at(&second, 8), 0.0);
    assert_eq!(second[17], 1, "batch survives a consuming read");
}

#[test]
fn idle_without_batch_never_touches_sensor() {
    let (svc, _radio) = paired_service();
    let sensor = MockSensor::new([Ok(SensorSample::new(20.0, 40.0))]);
    let reads = Arc::clone(&sensor.reads);
    let mut sampler = Sampler::new(Arc::clone(&svc), sensor, MockClock::default(), &fast_config());

    assert_eq!(sampler.tick(), TickOutcome::Idle);
    assert_eq!(reads.load(Ordering::Relaxed), 0);

    svc.write_control(&[4, 1, 0, 0, 0]).unwrap();
    svc.write_control(&[5]).unwrap();
    assert_eq!(sampler.tick(), TickOutcome::Idle);
    assert_eq!(reads.load(Ordering::Relaxed), 0);
}

#[test]
fn permanently_failing_sensor_reports_each_period() {
    let (svc, _radio) = paired_service();
    let sensor = MockSensor::new([]);
    let reads = Arc::clone(&sensor.reads);
    let config = fast_config();
    let mut sampler = Sampler::new(Arc::clone(&svc), sensor, MockClock::default(), &config);
    svc.store().set_active_batch(1).unwrap();

    for period in 1..=4u32 {
        assert!(matches!(
            sampler.tick(),
            TickOutcome::Failed(DecodeError::Timeout(_))
        ));
        assert_eq!(
            reads.load(Ordering::Relaxed),
            period * u32::from(config.read_attempts)
        );
    }
    assert_eq!(svc.store().history_len(), 0);
}

#[test]
fn subscribed_peer_is_notified_on_each_commit_without_consuming() {
    let (svc, radio) = paired_service();
    svc.on_link_event(LinkEvent::Subscribe {
        characteristic: Characteristic::Payload,
        enabled: true,
    });
    let sensor = MockSensor::new([
        Ok(SensorSample::new(10.0, 30.0)),
        Ok(SensorSample::new(65.0, 30.0)),
    ]);
    let mut sampler = Sampler::new(Arc::clone(&svc), sensor, MockClock::default(), &fast_config());
    svc.store().set_active_batch(3).unwrap();

    sampler.tick();
    assert_eq!(
        sampler.tick(),
        TickOutcome::Committed(StatusFlag::TempOutOfRange)
    );

    let sent = radio.notifications(Characteristic::Payload);
    assert_eq!(sent.len(), 2);
    let last = sent.last().unwrap();
    assert_eq!(f32_at(last, 0), 10.0);
    assert_eq!(f32_at(last, 4), 65.0);
    assert_eq!(last[16], StatusFlag::TempOutOfRange as u8);
    // Notifications leave the window open.
    assert_eq!(svc.store().peek().temp_min, 10.0);
}

#[test]
fn history_clear_via_control_keeps_sequence_running() {
    let (svc, _radio) = paired_service();
    svc.store().fold_in(SensorSample::new(20.0, 40.0), 0);
    svc.store().fold_in(SensorSample::new(20.0, 40.0), 0);
    svc.write_control(&[3]).unwrap();
    assert_eq!(svc.store().history_len(), 0);
    svc.store().fold_in(SensorSample::new(20.0, 40.0), 0);
    assert_eq!(svc.store().history_at_oldest(0).unwrap().sequence, 2);
}
