//! Edge Avoidance
//!
//! Watches the floor reflectance sensor and backs the robot off the ring
//! boundary. Runs on the high priority executor; an edge reaction outranks
//! every other behavior.
//!
//! The ring surface reads bright, the boundary line reads dark. A reading
//! below the edge threshold proposes a straight reverse at EDGE priority.
//! While the reading stays dark the proposal is repeated every period, so
//! the back-off lasts at least the configured edge duration after the robot
//! left the line.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::system::config::BehaviorConfig;
use crate::system::drive_command::{DriveCommandStore, Outcome, Priority};
use crate::system::error::StoreError;
use crate::system::readings::SensorReadings;
use crate::system::warm_up::WarmUpGate;

/// What one activation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum EdgeReaction {
    /// Warm-up still active, nothing touched
    Suppressed,
    /// Bright floor, nothing proposed
    OnRing,
    /// Dark floor, back-off proposed
    BackingOff(Outcome),
}

/// Edge avoidance producer
pub struct EdgeAvoidance<'a, M: RawMutex> {
    store: &'a DriveCommandStore<M>,
    gate: &'a WarmUpGate,
    readings: &'a SensorReadings,
    config: BehaviorConfig,
}

impl<'a, M: RawMutex> EdgeAvoidance<'a, M> {
    pub fn new(
        store: &'a DriveCommandStore<M>,
        gate: &'a WarmUpGate,
        readings: &'a SensorReadings,
        config: BehaviorConfig,
    ) -> Self {
        Self {
            store,
            gate,
            readings,
            config,
        }
    }

    /// Evaluates one light reading
    pub fn on_light(&self, light: u16) -> Result<EdgeReaction, StoreError> {
        if self.gate.is_active() {
            return Ok(EdgeReaction::Suppressed);
        }
        self.readings.record_light(light);

        if light >= self.config.edge_light_threshold {
            return Ok(EdgeReaction::OnRing);
        }

        let reverse = self.config.edge_reverse_speed.saturating_neg();
        let outcome = self
            .store
            .propose(Priority::Edge, reverse, reverse, self.config.edge_duration_ms)?;
        Ok(EdgeReaction::BackingOff(outcome))
    }
}

#[cfg(feature = "rp2350")]
mod firmware {
    use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
    use embassy_rp::gpio::Pull;
    use embassy_time::Ticker;

    use super::{EdgeAvoidance, EdgeReaction};
    use crate::system::config::BehaviorConfig;
    use crate::system::drive_command::SharedDriveCommandStore;
    use crate::system::readings::SensorReadings;
    use crate::system::resources::{Irqs, LightSensorResources};
    use crate::system::warm_up::WarmUpGate;

    /// Edge task: one light reading and one evaluation per light period
    #[embassy_executor::task]
    pub async fn edge_avoidance(
        r: LightSensorResources,
        store: &'static SharedDriveCommandStore,
        gate: &'static WarmUpGate,
        readings: &'static SensorReadings,
        config: BehaviorConfig,
    ) {
        let mut adc = Adc::new(r.adc, Irqs, AdcConfig::default());
        let mut channel = Channel::new_pin(r.light_pin, Pull::None);
        let edge = EdgeAvoidance::new(store, gate, readings, config);

        crate::log_info!("edge task started");
        let mut ticker = Ticker::every(config.light_period);
        let mut on_edge = false;
        loop {
            ticker.next().await;

            // A failed conversion reads as bright floor
            let light = adc.read(&mut channel).await.unwrap_or(u16::MAX);

            match edge.on_light(light) {
                Ok(EdgeReaction::BackingOff(_)) if !on_edge => {
                    on_edge = true;
                    crate::log_info!("ring edge detected, light {}", light);
                }
                Ok(EdgeReaction::OnRing) => on_edge = false,
                Ok(_) => {}
                Err(e) => panic!("edge task: {}", e),
            }
        }
    }
}

#[cfg(feature = "rp2350")]
pub use firmware::edge_avoidance;
