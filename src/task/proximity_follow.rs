//! Proximity Follow
//!
//! Reads the ultrasonic distance sensor every sonar period and either drives
//! at a target in range or hands over to the seek behavior.
//!
//! # Sensor Operation
//! - HC-SR04 measurements in centimeters, saturating at the sentinel (255)
//! - The sentinel means both "nothing in range" and "closer than the minimum
//!   range"; a single reading cannot tell them apart
//! - Failed measurements are reported as the sentinel
//!
//! # Evaluation order
//! Every activation runs two explicit steps, in this order:
//! 1. Saturation artifact: a sentinel right after a close reading means the
//!    target got too close to measure. Propose a short FOLLOW and do not
//!    remember the sentinel as the last reading.
//! 2. Primary decision on the reading: beyond the seek threshold hand over to
//!    seek, otherwise propose a short FOLLOW.
//!
//! Step 2 cannot undo step 1: a seek proposal loses against the FOLLOW
//! installed by step 1.
//!
//! NOTE: Must not be scheduled faster than the configured sonar period; the
//! seek timing windows are one period wide.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;

use crate::system::config::BehaviorConfig;
use crate::system::drive_command::{DriveCommandStore, Outcome, Priority};
use crate::system::error::StoreError;
use crate::system::readings::SensorReadings;
use crate::system::warm_up::WarmUpGate;
use crate::task::seek::{Seek, SeekAction};

/// Primary decision of one activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum RangeDecision {
    /// Target in range, FOLLOW proposed
    Follow(Outcome),
    /// Nothing in range, seek evaluated
    Seek(SeekAction),
}

/// What one activation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum SonarReaction {
    /// Warm-up still active, nothing touched
    Suppressed,
    /// Reading evaluated
    Evaluated {
        /// FOLLOW proposed by the saturation artifact rule, if it fired
        artifact: Option<Outcome>,
        decision: RangeDecision,
    },
}

/// Proximity-follow producer
pub struct ProximityFollow<'a, M: RawMutex> {
    store: &'a DriveCommandStore<M>,
    gate: &'a WarmUpGate,
    readings: &'a SensorReadings,
    config: BehaviorConfig,
    last_range: u16,
    first_activation: bool,
    seek: Seek,
}

impl<'a, M: RawMutex> ProximityFollow<'a, M> {
    /// Creates the producer; `seed` drives the seek start directions
    pub fn new(
        store: &'a DriveCommandStore<M>,
        gate: &'a WarmUpGate,
        readings: &'a SensorReadings,
        config: BehaviorConfig,
        seed: u64,
    ) -> Self {
        Self {
            store,
            gate,
            readings,
            last_range: config.range_sentinel,
            config,
            first_activation: true,
            seek: Seek::new(seed),
        }
    }

    /// Last accepted (non-artifact) reading
    pub fn last_range(&self) -> u16 {
        self.last_range
    }

    /// Evaluates one distance reading taken at `now`
    pub fn on_range(&mut self, range: u16, now: Instant) -> Result<SonarReaction, StoreError> {
        if self.gate.is_active() {
            return Ok(SonarReaction::Suppressed);
        }

        let sentinel = self.config.range_sentinel;

        // The sensor reports 0 on its very first measurement after power-up.
        let range = if self.first_activation && range == 0 {
            sentinel
        } else {
            range
        };
        self.first_activation = false;

        // Step 1: saturation artifact
        let artifact = if range == sentinel && self.last_range < self.config.close_range_threshold {
            crate::log_debug!("range saturated after {} cm, target too close", self.last_range);
            Some(self.propose_follow()?)
        } else {
            self.last_range = range;
            None
        };
        self.readings.record_range(range, self.last_range);

        // Step 2: primary decision
        let decision = if range > self.config.seek_distance_threshold {
            RangeDecision::Seek(self.seek.evaluate(self.store, &self.config, now)?)
        } else {
            RangeDecision::Follow(self.propose_follow()?)
        };

        Ok(SonarReaction::Evaluated { artifact, decision })
    }

    fn propose_follow(&self) -> Result<Outcome, StoreError> {
        self.store.propose(
            Priority::Follow,
            self.config.follow_speed,
            self.config.follow_speed,
            self.config.follow_duration_ms,
        )
    }
}

/// Converts a raw centimeter measurement to a sensor reading
///
/// Anything at or beyond the sentinel, negative or not a number saturates.
pub fn to_range(distance_cm: f64, sentinel: u16) -> u16 {
    if distance_cm.is_nan() || distance_cm < 0.0 || distance_cm >= f64::from(sentinel) {
        sentinel
    } else {
        distance_cm as u16
    }
}

#[cfg(feature = "rp2350")]
mod firmware {
    use embassy_rp::gpio::{Input, Level, Output, Pull};
    use embassy_time::Ticker;
    use hcsr04_async::{Config, DistanceUnit, Hcsr04, TemperatureUnit};

    use super::{to_range, ProximityFollow};
    use crate::system::clock::{Clock, SystemClock};
    use crate::system::config::BehaviorConfig;
    use crate::system::drive_command::SharedDriveCommandStore;
    use crate::system::readings::SensorReadings;
    use crate::system::resources::DistanceSensorResources;
    use crate::system::warm_up::WarmUpGate;

    /// Fixed ambient temperature for distance calculations
    const TEMPERATURE: f64 = 21.5;

    /// Proximity task: one measurement and one evaluation per sonar period
    #[embassy_executor::task]
    pub async fn proximity_follow(
        r: DistanceSensorResources,
        store: &'static SharedDriveCommandStore,
        gate: &'static WarmUpGate,
        readings: &'static SensorReadings,
        config: BehaviorConfig,
    ) {
        let hc_config = Config {
            distance_unit: DistanceUnit::Centimeters,
            temperature_unit: TemperatureUnit::Celsius,
        };
        let trigger = Output::new(r.trigger_pin, Level::Low);
        let echo = Input::new(r.echo_pin, Pull::None);
        let mut sensor = Hcsr04::new(trigger, echo, hc_config);
        let clock = SystemClock;
        let mut ticker = Ticker::every(config.sonar_period);

        crate::log_info!("proximity task started");
        while gate.is_active() {
            ticker.next().await;
        }

        let mut follow = None;
        loop {
            ticker.next().await;

            let range = match sensor.measure(TEMPERATURE).await {
                Ok(distance_cm) => to_range(distance_cm, config.range_sentinel),
                Err(_) => config.range_sentinel,
            };

            // Seeded at the first measurement after warm-up, which carries the
            // start-up and echo jitter. That measurement is still evaluated.
            let now = clock.now();
            let follow = follow.get_or_insert_with(|| {
                let seed = now.as_ticks() ^ u64::from(range);
                ProximityFollow::new(store, gate, readings, config, seed)
            });

            if let Err(e) = follow.on_range(range, now) {
                panic!("proximity task: {}", e);
            }
        }
    }
}

#[cfg(feature = "rp2350")]
pub use firmware::proximity_follow;
