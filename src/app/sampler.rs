//! Periodic sampling worker.
//!
//! Reads the sensor once per period while a batch is active, retrying a
//! bounded number of times, and folds each good sample into the store.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::config::NodeConfig;
use crate::error::DecodeError;

use super::ports::{ClockPort, RadioPort, SensorPort};
use super::service::TelemetryService;
use super::telemetry::StatusFlag;

/// What a single [`Sampler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No batch active, or the batch changed while the sensor was read.
    /// Nothing was committed.
    Idle,
    /// A sample was folded in with this classification.
    Committed(StatusFlag),
    /// Every attempt failed; the last error is reported.
    Failed(DecodeError),
}

pub struct Sampler<R: RadioPort, S: SensorPort, C: ClockPort> {
    service: Arc<TelemetryService<R>>,
    sensor: S,
    clock: C,
    attempts: u8,
    retry_delay: Duration,
    period: Duration,
    boot_settle: Duration,
}

impl<R: RadioPort, S: SensorPort, C: ClockPort> Sampler<R, S, C> {
    pub fn new(service: Arc<TelemetryService<R>>, sensor: S, clock: C, config: &NodeConfig) -> Self {
        Self {
            service,
            sensor,
            clock,
            attempts: config.read_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms.into()),
            period: Duration::from_millis(config.sample_period_ms.into()),
            boot_settle: Duration::from_millis(config.boot_settle_ms.into()),
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        let Some(batch) = self.service.store().active_batch() else {
            return TickOutcome::Idle;
        };

        let mut last_err = DecodeError::Pin;
        for attempt in 1..=self.attempts {
            match self.sensor.read_sample() {
                Ok(sample) => {
                    let uptime = self.clock.uptime_secs();
                    let Some(flag) = self.service.store().fold_in_for_batch(batch, sample, uptime) else {
                        debug!("SAMPLE | batch {} ended during read, sample dropped", batch);
                        return TickOutcome::Idle;
                    };
                    debug!(
                        "SAMPLE | t={:.1}C h={:.1}% flag={:?}",
                        sample.temperature_celsius, sample.humidity_percent, flag
                    );
                    self.service.publish_payload();
                    return TickOutcome::Committed(flag);
                }
                Err(e) => {
                    last_err = e;
                    if attempt < self.attempts && !self.retry_delay.is_zero() {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        warn!("SAMPLE | read failed after {} attempts: {}", self.attempts, last_err);
        TickOutcome::Failed(last_err)
    }

    /// Worker loop: settle once, then tick every period.
    pub fn run(&mut self) -> ! {
        thread::sleep(self.boot_settle);
        loop {
            self.tick();
            thread::sleep(self.period);
        }
    }
}
